//! Dispenser command handler.

use tabled::Tabled;

use pumpwatch_core::{DispenserView, StationView};

use crate::cli::{DispensersArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct DispenserRow {
    #[tabled(rename = "#")]
    number: u8,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Nozzle")]
    nozzle: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Display")]
    display: String,
    #[tabled(rename = "Attendant")]
    attendant: String,
    #[tabled(rename = "Liters")]
    liters: String,
}

impl DispenserRow {
    pub(crate) fn new(d: &DispenserView, color: bool) -> Self {
        Self {
            number: d.dispenser_number,
            status: output::paint_status(d.status, color),
            nozzle: d
                .active_nozzle
                .as_ref()
                .map_or_else(output::dash, |n| n.code.to_string()),
            product: output::fmt_opt(d.active_nozzle.as_ref().map(|n| n.product.as_str())),
            display: output::fmt_amount(d.display_liters),
            attendant: output::fmt_opt(d.attendant_name.as_deref()),
            liters: output::fmt_amount(d.calculated_liters),
        }
    }
}

pub(crate) fn line(d: &DispenserView) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        d.dispenser_number,
        output::status_name(d.status),
        d.active_nozzle
            .as_ref()
            .map_or_else(output::dash, |n| n.code.to_string()),
        output::fmt_opt(d.attendant_name.as_deref()),
        output::fmt_amount(d.calculated_liters),
    )
}

fn detail(d: &DispenserView) -> String {
    let codes: Vec<String> = d.nozzle_codes.iter().map(ToString::to_string).collect();
    let mut lines = vec![
        format!("Dispenser:  {}", d.dispenser_number),
        format!("Nozzles:    {}", codes.join(", ")),
        format!(
            "Status:     {} ({})",
            output::status_name(d.status),
            d.status.label()
        ),
    ];
    if let Some(ref active) = d.active_nozzle {
        lines.push(format!("Active:     {} {}", active.code, active.product));
    }
    lines.push(format!("Display:    {}", output::fmt_amount(d.display_liters)));
    lines.push(format!(
        "Attendant:  {}",
        output::fmt_opt(d.attendant_name.as_deref())
    ));
    if let Some(ref photo) = d.attendant_photo_url {
        lines.push(format!("Photo:      {photo}"));
    }
    lines.push(format!(
        "Liters:     {}",
        output::fmt_amount(d.calculated_liters)
    ));
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(view: &StationView, args: &DispensersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    let out = match args.number {
        Some(number) => {
            let dispenser = view
                .dispensers
                .iter()
                .find(|d| d.dispenser_number == number)
                .ok_or_else(|| CliError::DispenserNotFound {
                    number,
                    available: u8::try_from(view.dispensers.len()).unwrap_or(u8::MAX),
                })?;
            output::render_single(&global.output, dispenser, detail, line)?
        }
        None => output::render_list(
            &global.output,
            &view.dispensers,
            |d| DispenserRow::new(d, color),
            line,
        )?,
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
