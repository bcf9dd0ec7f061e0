//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use pumpwatch_core::NozzleStatus;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Kebab-case status name, matching what `--status` accepts.
pub fn status_name(status: NozzleStatus) -> &'static str {
    match status {
        NozzleStatus::NotConfigured => "not-configured",
        NozzleStatus::Available => "available",
        NozzleStatus::Blocked => "blocked",
        NozzleStatus::Fueling => "fueling",
        NozzleStatus::Ready => "ready",
        NozzleStatus::Waiting => "waiting",
        NozzleStatus::Failure => "failure",
        NozzleStatus::Busy => "busy",
        NozzleStatus::Error => "error",
    }
}

/// Status cell, colored by severity when enabled.
pub fn paint_status(status: NozzleStatus, color: bool) -> String {
    let name = status_name(status);
    if !color {
        return name.to_owned();
    }
    match status {
        NozzleStatus::Fueling => name.green().bold().to_string(),
        NozzleStatus::Ready | NozzleStatus::Waiting | NozzleStatus::Busy => {
            name.yellow().to_string()
        }
        NozzleStatus::Failure | NozzleStatus::Error => name.red().bold().to_string(),
        NozzleStatus::Blocked => name.magenta().to_string(),
        NozzleStatus::Available => name.cyan().to_string(),
        NozzleStatus::NotConfigured => name.dimmed().to_string(),
    }
}

// ── Cell helpers ─────────────────────────────────────────────────────

pub fn dash() -> String {
    "-".into()
}

/// Two-decimal number, or a dash for "no data".
pub fn fmt_amount(value: Option<f64>) -> String {
    value.map_or_else(dash, |v| format!("{v:.2}"))
}

pub fn fmt_opt(value: Option<&str>) -> String {
    value.map_or_else(dash, ToOwned::to_owned)
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `line_fn` on each item to emit one record per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&line_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted string,
/// since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(line_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(rendered)
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}
