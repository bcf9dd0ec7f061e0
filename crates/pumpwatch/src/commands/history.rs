//! Fueling history command handler.

use chrono::{Local, NaiveDate};
use tabled::Tabled;

use pumpwatch_core::{FuelingTransaction, HistoryQuery, Monitor, MonitorConfig};

use crate::cli::{GlobalOpts, HistoryArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
pub(crate) struct TransactionRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Nozzle")]
    nozzle: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Cash")]
    cash: String,
    #[tabled(rename = "Liters")]
    liters: String,
    #[tabled(rename = "Attendant")]
    attendant: String,
    #[tabled(rename = "OK")]
    verified: String,
}

fn date(t: &FuelingTransaction) -> String {
    t.recorded_at
        .map_or_else(output::dash, |at| at.format("%Y-%m-%d %H:%M").to_string())
}

impl From<&FuelingTransaction> for TransactionRow {
    fn from(t: &FuelingTransaction) -> Self {
        Self {
            date: date(t),
            nozzle: t.nozzle.map_or_else(output::dash, |n| n.to_string()),
            product: output::fmt_opt(t.product.as_deref()),
            cash: output::fmt_amount(t.cash),
            liters: output::fmt_amount(t.liters),
            attendant: output::fmt_opt(t.attendant_name.as_deref()),
            verified: if t.verified { "yes" } else { "no" }.into(),
        }
    }
}

pub(crate) fn line(t: &FuelingTransaction) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        output::fmt_opt(t.id.as_deref()),
        date(t),
        t.nozzle.map_or_else(output::dash, |n| n.to_string()),
        output::fmt_amount(t.cash),
        output::fmt_amount(t.liters),
        output::fmt_opt(t.attendant_name.as_deref()),
    )
}

/// Whole days, both ends inclusive; either end defaults to `today`.
fn query(args: &HistoryArgs, today: NaiveDate) -> HistoryQuery {
    HistoryQuery {
        from: args.from.unwrap_or(today).and_hms_opt(0, 0, 0),
        to: args.to.unwrap_or(today).and_hms_opt(23, 59, 59),
        nozzle: args.nozzle,
    }
}

pub async fn handle(
    config: MonitorConfig,
    args: &HistoryArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let query = query(args, Local::now().date_naive());
    let monitor = Monitor::connect(config)?;
    let transactions = monitor.history(&query).await?;

    let out = output::render_list(
        &global.output,
        &transactions,
        |t| TransactionRow::from(t),
        line,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
