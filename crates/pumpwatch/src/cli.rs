//! Clap derive structures for the `pumpwatch` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use pumpwatch_core::{Identifier, NozzleCode, NozzleStatus, PriceLevel};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pumpwatch -- live dispenser monitor for fuel stations
#[derive(Debug, Parser)]
#[command(
    name = "pumpwatch",
    version,
    about = "Monitor fuel station dispensers from the command line",
    long_about = "Aggregates the per-nozzle status and reading feeds of a station\n\
        backend into one record per dispenser, enriched with the attendant\n\
        operating it and the liters dispensed so far.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Station profile to use
    #[arg(long, short = 'p', env = "PUMPWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 'b', env = "PUMPWATCH_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Bearer token for the backend
    #[arg(long, env = "PUMPWATCH_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PUMPWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "PUMPWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "PUMPWATCH_TIMEOUT", default_value = "10", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one record per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show one aggregated record per dispenser
    #[command(alias = "disp", alias = "d")]
    Dispensers(DispensersArgs),

    /// Show every nozzle with its reading and attendant
    #[command(alias = "n")]
    Nozzles(NozzlesArgs),

    /// List nozzles currently fueling
    #[command(alias = "f")]
    Fuelings,

    /// Stream live updates until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Authorize a nozzle for one fueling under an attendant's tag
    Preset(PresetArgs),

    /// List completed fuelings
    #[command(alias = "h")]
    History(HistoryArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VIEWS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DispensersArgs {
    /// Show details for a single dispenser
    #[arg(value_name = "NUMBER")]
    pub number: Option<u8>,
}

#[derive(Debug, Args)]
pub struct NozzlesArgs {
    /// Only nozzles of this dispenser
    #[arg(long, short = 'd')]
    pub dispenser: Option<u8>,

    /// Only nozzles in this state (e.g. fueling, available)
    #[arg(long, short = 's', value_parser = parse_status)]
    pub status: Option<NozzleStatus>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Which view to stream
    #[arg(long, default_value = "dispensers")]
    pub view: WatchView,

    /// Stop after this many updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Poll only; do not open the push hub
    #[arg(long)]
    pub no_push: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WatchView {
    Dispensers,
    Nozzles,
    Fuelings,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OPERATOR REQUESTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("limit").required(true).args(["amount", "liters", "full"])))]
pub struct PresetArgs {
    /// Nozzle code (e.g. 04)
    #[arg(value_name = "NOZZLE")]
    pub nozzle: NozzleCode,

    /// RFID tag of the authorizing attendant
    #[arg(long, short = 't')]
    pub tag: String,

    /// Stop after this currency amount
    #[arg(long)]
    pub amount: Option<f64>,

    /// Stop after this many liters
    #[arg(long)]
    pub liters: Option<f64>,

    /// Fill the tank
    #[arg(long)]
    pub full: bool,

    /// Who presents the tag (attendant, customer)
    #[arg(long, default_value = "attendant")]
    pub identifier: Identifier,

    /// Price level to bill at (cash, credit, debit)
    #[arg(long, default_value = "cash")]
    pub price_level: PriceLevel,

    /// Seconds the nozzle stays authorized waiting for a lift
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(0..=99)
    )]
    pub authorize_for: u64,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// First day to include (YYYY-MM-DD, default today)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD, default today)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Only fuelings from this nozzle
    #[arg(long, short = 'n')]
    pub nozzle: Option<NozzleCode>,
}

fn parse_status(raw: &str) -> Result<NozzleStatus, String> {
    let normalized: String = raw.chars().filter(|c| !matches!(c, '-' | '_')).collect();
    normalized.parse().map_err(|_| {
        format!(
            "unknown status '{raw}' (expected one of: not-configured, available, blocked, \
             fueling, ready, waiting, failure, busy, error)"
        )
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a configuration value on the active profile
    Set {
        /// Config key (e.g., "backend", "cash_scale", "products.07")
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active profile's bearer token in the system keyring
    SetToken,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
