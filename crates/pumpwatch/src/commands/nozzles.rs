//! Nozzle command handler.

use tabled::Tabled;

use pumpwatch_core::{NozzleView, StationView, TagId};

use crate::cli::{GlobalOpts, NozzlesArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
pub(crate) struct NozzleRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Disp")]
    dispenser: u8,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Cash")]
    cash: String,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Attendant")]
    attendant: String,
}

impl NozzleRow {
    pub(crate) fn new(n: &NozzleView, color: bool) -> Self {
        Self {
            code: n.code.to_string(),
            dispenser: n.dispenser,
            product: n.product.clone(),
            status: output::paint_status(n.status, color),
            cash: output::fmt_amount(n.cash),
            tag: output::fmt_opt(n.tag.as_ref().map(TagId::as_str)),
            attendant: output::fmt_opt(n.attendant_name.as_deref()),
        }
    }
}

pub(crate) fn line(n: &NozzleView) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        n.code,
        n.dispenser,
        output::status_name(n.status),
        output::fmt_amount(n.cash),
    )
}

fn matches(n: &NozzleView, args: &NozzlesArgs) -> bool {
    args.dispenser.is_none_or(|d| n.dispenser == d) && args.status.is_none_or(|s| n.status == s)
}

pub fn handle(view: &StationView, args: &NozzlesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let selected: Vec<&NozzleView> = view.nozzles.iter().filter(|n| matches(n, args)).collect();

    let out = output::render_list(
        &global.output,
        &selected,
        |n| NozzleRow::new(n, color),
        |n| line(n),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
