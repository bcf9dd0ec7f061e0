//! Config subcommand handlers.

use std::collections::HashMap;

use dialoguer::{Confirm, Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Mask plaintext tokens before the config leaves the process.
fn redact(cfg: &mut Config) {
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some(REDACTED.into());
        }
    }
}

/// Format config for display. Expects an already redacted config.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "backend = \"{}\"", p.backend);
        if let Some(ref token) = p.token {
            let _ = writeln!(out, "token = \"{token}\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        let _ = writeln!(out, "push = {}", p.push);
        if let Some(ref hub) = p.hub_path {
            let _ = writeln!(out, "hub_path = \"{hub}\"");
        }
        if let Some(ms) = p.status_interval_ms {
            let _ = writeln!(out, "status_interval_ms = {ms}");
        }
        if let Some(ms) = p.visualization_interval_ms {
            let _ = writeln!(out, "visualization_interval_ms = {ms}");
        }
        if let Some(secs) = p.reading_ttl_secs {
            let _ = writeln!(out, "reading_ttl_secs = {secs}");
        }
        if let Some(scale) = p.cash_scale {
            let _ = writeln!(out, "cash_scale = {scale}");
        }
        if let Some(n) = p.dispensers {
            let _ = writeln!(out, "dispensers = {n}");
        }
        if let Some(n) = p.nozzles_per_dispenser {
            let _ = writeln!(out, "nozzles_per_dispenser = {n}");
        }
        for (code, product) in &p.products {
            let _ = writeln!(out, "products.\"{code}\" = \"{product}\"");
        }
    }

    out
}

/// Delegate to the shared config crate's save function.
fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn profile_not_found(name: String, cfg: &Config) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

/// Offer to store a token in the system keyring or return it for plaintext config.
///
/// Returns `Some(token)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_keyring_storage(token: &str, profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the token?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        config::store_token(profile_name, token)?;
        eprintln!("   ✓ Token stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(token.to_owned()))
    }
}

/// Apply `key = value` to a profile.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    if let Some(code) = key.strip_prefix("products.") {
        let code: pumpwatch_core::NozzleCode = parse_value(key, code, "a nozzle code 01..99")?;
        // Normalized so "7" and "07" address the same override.
        profile.products.insert(code.to_string(), value);
        return Ok(());
    }

    match key {
        "backend" => profile.backend = value,
        "token" => profile.token = Some(value),
        "token_env" | "token-env" => profile.token_env = Some(value),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => profile.insecure = Some(parse_value(key, &value, "'true' or 'false'")?),
        "timeout" => profile.timeout = Some(parse_value(key, &value, "a number (seconds)")?),
        "push" => profile.push = parse_value(key, &value, "'true' or 'false'")?,
        "hub_path" | "hub-path" => profile.hub_path = Some(value),
        "status_interval_ms" => {
            profile.status_interval_ms = Some(parse_value(key, &value, "a number (ms)")?);
        }
        "visualization_interval_ms" => {
            profile.visualization_interval_ms = Some(parse_value(key, &value, "a number (ms)")?);
        }
        "attendant_cache_secs" => {
            profile.attendant_cache_secs = Some(parse_value(key, &value, "a number (seconds)")?);
        }
        "price_cache_secs" => {
            profile.price_cache_secs = Some(parse_value(key, &value, "a number (seconds)")?);
        }
        "reading_ttl_secs" => {
            profile.reading_ttl_secs = Some(parse_value(key, &value, "a number (seconds)")?);
        }
        "cash_scale" | "cash-scale" => {
            let scale: f64 = parse_value(key, &value, "a positive number")?;
            if !(scale.is_finite() && scale > 0.0) {
                return Err(CliError::Validation {
                    field: key.into(),
                    reason: "must be a positive number".into(),
                });
            }
            profile.cash_scale = Some(scale);
        }
        "dispensers" => profile.dispensers = Some(parse_value(key, &value, "a number 1..99")?),
        "nozzles_per_dispenser" => {
            profile.nozzles_per_dispenser = Some(parse_value(key, &value, "a number 1..99")?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: backend, token, token_env, \
                     ca_cert, insecure, timeout, push, hub_path, status_interval_ms, \
                     visualization_interval_ms, attendant_cache_secs, price_cache_secs, \
                     reading_ttl_secs, cash_scale, dispensers, nozzles_per_dispenser, \
                     products.<code>"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = config::load_config_or_default();
            redact(&mut cfg);
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                config::config_path().display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(|| Profile::new(String::new()));
            set_key(profile, &key, value)?;

            save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: pumpwatch config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(name, &cfg));
            }

            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(profile_name, &cfg));
            }

            let token = rpassword::prompt_password("Bearer token: ").map_err(prompt_err)?;
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            config::store_token(&profile_name, &token)?;
            eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

/// Interactive wizard writing a fresh config with one profile.
fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("⛽ pumpwatch: configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Backend URL
    let backend: String = Input::new()
        .with_prompt("Station backend URL")
        .default("http://192.168.0.10:5000".into())
        .validate_with(|input: &String| -> Result<(), String> {
            url::Url::parse(input)
                .map(|_| ())
                .map_err(|e| format!("invalid URL: {e}"))
        })
        .interact_text()
        .map_err(prompt_err)?;

    let mut profile = Profile::new(backend);

    // 3. Token (optional)
    let needs_token = Confirm::new()
        .with_prompt("Does the backend require a bearer token?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    if needs_token {
        let token = rpassword::prompt_password("Bearer token: ").map_err(prompt_err)?;
        if token.is_empty() {
            return Err(CliError::Validation {
                field: "token".into(),
                reason: "token cannot be empty".into(),
            });
        }
        profile.token = prompt_keyring_storage(&token, &profile_name)?;
    }

    // 4. Cash scale
    let scale: String = Input::new()
        .with_prompt("Cash scale (1 if the backend reports currency units, 0.01 for cents)")
        .default("1".into())
        .interact_text()
        .map_err(prompt_err)?;
    if scale.trim() != "1" {
        set_key(&mut profile, "cash_scale", scale)?;
    }

    // 5. Push hub
    profile.push = Confirm::new()
        .with_prompt("Subscribe to the realtime push hub?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;

    let mut profiles = HashMap::new();
    profiles.insert(profile_name.clone(), profile);
    let cfg = Config {
        default_profile: Some(profile_name.clone()),
        profiles,
        ..Config::default()
    };

    save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: pumpwatch dispensers");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_key_normalizes_product_codes() {
        let mut profile = Profile::new("http://station.local");
        set_key(&mut profile, "products.7", "Premium".into())
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(profile.products.get("07").map(String::as_str), Some("Premium"));
        assert!(set_key(&mut profile, "products.abc", "X".into()).is_err());
    }

    #[test]
    fn set_key_rejects_non_positive_scale() {
        let mut profile = Profile::new("http://station.local");
        assert!(set_key(&mut profile, "cash_scale", "0".into()).is_err());
        assert!(set_key(&mut profile, "cash_scale", "0.01".into()).is_ok());
        assert!(profile.cash_scale.is_some_and(|s| (s - 0.01).abs() < f64::EPSILON));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut profile = Profile::new("http://station.local");
        let err = set_key(&mut profile, "colour", "x".into())
            .err()
            .unwrap_or_else(|| panic!("expected an error"));
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn shown_config_masks_tokens() {
        let mut profile = Profile::new("http://station.local");
        profile.token = Some("s3cret".into());
        let mut cfg = Config::default();
        cfg.profiles.insert("north".into(), profile);

        redact(&mut cfg);
        let text = format_config(&cfg);

        assert!(text.contains("[profiles.north]"));
        assert!(text.contains("token = \"****\""));
        assert!(!text.contains("s3cret"));
    }
}
