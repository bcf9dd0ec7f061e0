//! Active fueling command handler.

use tabled::Tabled;

use pumpwatch_core::{ActiveFueling, StationView};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
pub(crate) struct FuelingRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Disp")]
    dispenser: u8,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Cash")]
    cash: String,
    #[tabled(rename = "Liters")]
    liters: String,
    #[tabled(rename = "Attendant")]
    attendant: String,
}

impl From<&ActiveFueling> for FuelingRow {
    fn from(f: &ActiveFueling) -> Self {
        Self {
            code: f.code.to_string(),
            dispenser: f.dispenser,
            product: f.product.clone(),
            cash: output::fmt_amount(f.cash),
            liters: output::fmt_amount(f.liters),
            attendant: output::fmt_opt(f.attendant_name.as_deref()),
        }
    }
}

pub(crate) fn line(f: &ActiveFueling) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        f.code,
        f.product,
        output::fmt_amount(f.cash),
        output::fmt_amount(f.liters)
    )
}

pub fn handle(view: &StationView, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(&global.output, &view.fuelings, |f| FuelingRow::from(f), line)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use pumpwatch_core::NozzleCode;

    use super::*;

    #[test]
    fn unpriced_fueling_shows_dash_liters() {
        let fueling = ActiveFueling {
            code: NozzleCode::new(20).unwrap_or_else(|| panic!("bad code")),
            dispenser: 7,
            product: "Regular".into(),
            cash: Some(250.0),
            attendant_name: None,
            liters: None,
        };
        assert_eq!(line(&fueling), "20\tRegular\t250.00\t-");
        assert_eq!(FuelingRow::from(&fueling).liters, "-");
    }

    #[test]
    fn fueling_without_reading_shows_dashes() {
        let fueling = ActiveFueling {
            code: NozzleCode::new(19).unwrap_or_else(|| panic!("bad code")),
            dispenser: 7,
            product: "Super".into(),
            cash: None,
            attendant_name: None,
            liters: None,
        };
        assert_eq!(line(&fueling), "19\tSuper\t-\t-");
        assert_eq!(FuelingRow::from(&fueling).cash, "-");
    }
}
