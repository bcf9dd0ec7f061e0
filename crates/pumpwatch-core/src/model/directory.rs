// ── Slow-changing reference data ──
//
// Attendant directory and price table records, already normalized.

use serde::Serialize;

use super::reading::TagId;

/// An attendant who can authorize fuelings with an RFID tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendantIdentity {
    pub tag: Option<TagId>,
    pub name: String,
    /// Absolute URL (relative backend paths are resolved on ingest).
    pub photo_url: Option<String>,
    pub code: Option<String>,
    pub active: bool,
}

/// Current unit price for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPrice {
    pub product_name: String,
    /// Currency per liter. Zero or negative disables liters computation.
    pub unit_price: f64,
}
