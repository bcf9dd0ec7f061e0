//! CLI configuration: thin wrapper around `pumpwatch_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--backend, --token, etc.).

use secrecy::SecretString;

use pumpwatch_core::MonitorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use pumpwatch_config::{
    Config, Profile, config_path, load_config_or_default, save_config, store_token,
};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Resolve the `MonitorConfig` for this invocation.
///
/// Flags override profile values. Without a matching profile, a
/// `--backend` flag alone is enough to run against an unauthenticated
/// backend with the standard layout.
pub fn resolve_monitor_config(global: &GlobalOpts) -> Result<MonitorConfig, CliError> {
    let config = load_config_or_default();
    let name = active_profile_name(global, &config);

    let mut profile = match (config.profiles.get(&name), global.backend.as_deref()) {
        (Some(profile), _) => profile.clone(),
        (None, Some(backend)) => Profile::new(backend),
        (None, None) if global.profile.is_some() => {
            let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    apply_overrides(&mut profile, global);

    let token = match global.token {
        Some(ref token) => Some(SecretString::from(token.clone())),
        None => pumpwatch_config::resolve_token(&profile, &name),
    };

    Ok(pumpwatch_config::build_monitor_config(&profile, token)?)
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref backend) = global.backend {
        profile.backend.clone_from(backend);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    // The flag always carries a value; only a non-default one beats the profile.
    if profile.timeout.is_none() || global.timeout != DEFAULT_TIMEOUT_SECS {
        profile.timeout = Some(global.timeout);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["pumpwatch"];
        argv.extend_from_slice(args);
        argv.push("fuelings");
        Cli::try_parse_from(argv)
            .map(|cli| cli.global)
            .unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    #[test]
    fn flags_override_profile_values() {
        let mut profile = Profile::new("http://10.0.0.1:5000");
        profile.timeout = Some(30);

        apply_overrides(
            &mut profile,
            &global(&["--backend", "http://10.0.0.2:5000", "-k", "--timeout", "5"]),
        );

        assert_eq!(profile.backend, "http://10.0.0.2:5000");
        assert_eq!(profile.insecure, Some(true));
        assert_eq!(profile.timeout, Some(5));
    }

    #[test]
    fn default_timeout_flag_keeps_profile_timeout() {
        let mut profile = Profile::new("http://10.0.0.1:5000");
        profile.timeout = Some(30);

        apply_overrides(&mut profile, &global(&[]));

        assert_eq!(profile.timeout, Some(30));
        assert_eq!(profile.insecure, None);
    }

    #[test]
    fn profile_name_falls_back_to_default() {
        let config = Config::default();
        assert_eq!(active_profile_name(&global(&[]), &config), "default");
        assert_eq!(
            active_profile_name(&global(&["-p", "north"]), &config),
            "north"
        );
    }
}
