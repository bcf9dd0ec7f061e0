// ── Per-nozzle views ──

use serde::Serialize;

use super::nozzle::{NozzleCode, NozzleStatus};
use super::reading::TagId;

/// One nozzle card of the 30-nozzle monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NozzleView {
    pub code: NozzleCode,
    pub dispenser: u8,
    pub product: String,
    pub status: NozzleStatus,
    /// Scaled running total, if a reading exists.
    pub cash: Option<f64>,
    pub tag: Option<TagId>,
    pub attendant_name: Option<String>,
}

/// A nozzle currently in the `Fueling` state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveFueling {
    pub code: NozzleCode,
    pub dispenser: u8,
    pub product: String,
    /// Scaled running total, if a reading exists.
    pub cash: Option<f64>,
    pub attendant_name: Option<String>,
    pub liters: Option<f64>,
}
