// ── Dispenser groups and views ──

use serde::Serialize;

use super::nozzle::{NozzleCode, NozzleReading, NozzleStatus};

/// The member nozzle singled out for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveNozzle {
    pub code: NozzleCode,
    pub product: String,
}

/// Nozzles of one dispenser folded into a single status.
///
/// A pure view: recomputed from the status snapshot and the reading
/// store on every pass, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenserGroup {
    pub number: u8,
    /// Members in ascending code order.
    pub members: Vec<NozzleReading>,
    pub status: NozzleStatus,
    pub active_nozzle: Option<ActiveNozzle>,
    /// Sum of positive scaled cash across members. `None` means no data,
    /// which is distinct from zero.
    pub display_liters: Option<f64>,
}

impl DispenserGroup {
    pub fn nozzle_codes(&self) -> Vec<NozzleCode> {
        self.members.iter().map(|m| m.code).collect()
    }
}

/// Final per-dispenser record handed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenserView {
    pub dispenser_number: u8,
    pub nozzle_codes: Vec<NozzleCode>,
    pub status: NozzleStatus,
    pub active_nozzle: Option<ActiveNozzle>,
    pub display_liters: Option<f64>,
    pub attendant_name: Option<String>,
    pub attendant_photo_url: Option<String>,
    pub calculated_liters: Option<f64>,
}
