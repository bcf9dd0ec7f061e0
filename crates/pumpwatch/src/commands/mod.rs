//! Command dispatch: bridges CLI args -> monitor snapshots -> output formatting.

pub mod config_cmd;
pub mod dispensers;
pub mod fuelings;
pub mod history;
pub mod nozzles;
pub mod preset;
pub mod util;
pub mod watch;

use std::sync::Arc;

use tracing::debug;

use pumpwatch_core::{Monitor, MonitorConfig, StationView};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a station-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: MonitorConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Dispensers(args) => dispensers::handle(&*snapshot(config).await?, &args, global),
        Command::Nozzles(args) => nozzles::handle(&*snapshot(config).await?, &args, global),
        Command::Fuelings => fuelings::handle(&*snapshot(config).await?, global),
        Command::Watch(args) => watch::handle(config, &args, global).await,
        Command::Preset(args) => preset::handle(config, &args, global).await,
        Command::History(args) => history::handle(config, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "not a station command".into(),
        }),
    }
}

/// One fetch round against the backend, without background tasks.
async fn snapshot(config: MonitorConfig) -> Result<Arc<StationView>, CliError> {
    debug!(backend = %config.backend_url, "fetching station snapshot");
    let monitor = Monitor::connect(config)?;
    Ok(monitor.snapshot().await?)
}
