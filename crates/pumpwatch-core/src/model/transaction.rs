// ── Fueling history ──
//
// Completed fuelings as the backend records them, plus the filter used
// to fetch them. Timestamps are backend-local and carry no offset.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::nozzle::NozzleCode;
use super::reading::TagId;
use crate::error::CoreError;

/// Wire format of history bounds and transaction dates.
pub const HISTORY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One completed fueling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelingTransaction {
    pub id: Option<String>,
    pub recorded_at: Option<NaiveDateTime>,
    pub nozzle: Option<NozzleCode>,
    pub product: Option<String>,
    pub cash: Option<f64>,
    pub liters: Option<f64>,
    pub unit_price: Option<f64>,
    /// First tag the controller attached to the fueling.
    pub tag: Option<TagId>,
    pub attendant_name: Option<String>,
    pub attendant_code: Option<String>,
    /// Both the integrity and the checksum flags were set.
    pub verified: bool,
}

/// Bounds for a history fetch. Both ends are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub nozzle: Option<NozzleCode>,
}

impl HistoryQuery {
    pub fn validate(&self) -> Result<(), CoreError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(CoreError::InvalidRequest {
                message: format!("history range starts after it ends ({from} > {to})"),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn reversed_range_is_rejected() {
        let query = HistoryQuery {
            from: Some(at(16, 0)),
            to: Some(at(15, 23)),
            nozzle: None,
        };
        assert!(matches!(query.validate(), Err(CoreError::InvalidRequest { .. })));
    }

    #[test]
    fn open_ended_ranges_are_fine() {
        let query = HistoryQuery {
            from: Some(at(16, 0)),
            ..HistoryQuery::default()
        };
        assert!(query.validate().is_ok());
        assert!(HistoryQuery::default().validate().is_ok());
    }
}
