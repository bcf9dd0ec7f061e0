//! Tag-authorized preset command handler.

use std::time::Duration;

use serde::Serialize;

use pumpwatch_core::{
    Monitor, MonitorConfig, NozzleCode, PresetLimit, PresetOrder, PriceLevel, TagId,
};

use crate::cli::{GlobalOpts, PresetArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// What was sent, for rendering.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PresetSent {
    nozzle: NozzleCode,
    attendant: String,
    limit: PresetLimit,
    price_level: PriceLevel,
    timeout_seconds: u64,
}

fn order(args: &PresetArgs) -> Result<PresetOrder, CliError> {
    let tag = TagId::parse(&args.tag).ok_or_else(|| CliError::Validation {
        field: "tag".into(),
        reason: "must not be blank".into(),
    })?;
    let limit = match (args.amount, args.liters) {
        (Some(amount), _) => PresetLimit::Amount(amount),
        (None, Some(liters)) => PresetLimit::Volume(liters),
        (None, None) => PresetLimit::FullTank,
    };

    let mut order = PresetOrder::new(args.nozzle, tag, limit);
    order.identifier = args.identifier;
    order.price_level = args.price_level;
    order.timeout = Duration::from_secs(args.authorize_for);
    order.validate()?;
    Ok(order)
}

fn describe(limit: PresetLimit) -> String {
    match limit {
        PresetLimit::Amount(amount) => format!("up to {amount:.2}"),
        PresetLimit::Volume(liters) => format!("up to {liters:.2} L"),
        PresetLimit::FullTank => "full tank".into(),
    }
}

fn detail(sent: &PresetSent) -> String {
    format!(
        "Preset sent to nozzle {} for {}: {}, {} price, {}s to lift",
        sent.nozzle,
        sent.attendant,
        describe(sent.limit),
        sent.price_level,
        sent.timeout_seconds
    )
}

fn line(sent: &PresetSent) -> String {
    format!("{}\t{}", sent.nozzle, sent.attendant)
}

pub async fn handle(
    config: MonitorConfig,
    args: &PresetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let order = order(args)?;
    let prompt = format!(
        "Authorize nozzle {} ({}) for tag {}?",
        order.nozzle,
        describe(order.limit),
        order.tag
    );
    if !util::confirm(&prompt, global.yes)? {
        return Ok(());
    }

    let monitor = Monitor::connect(config)?;
    let attendant = monitor.preset(&order).await?;

    let sent = PresetSent {
        nozzle: order.nozzle,
        attendant: attendant.name,
        limit: order.limit,
        price_level: order.price_level,
        timeout_seconds: order.timeout.as_secs(),
    };
    let out = output::render_single(&global.output, &sent, detail, line)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
