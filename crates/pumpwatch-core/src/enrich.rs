// ── Enrichment ──
//
// Attaches operator identity and price-derived liters to a dispenser
// group. Missing data yields `None` fields, never an error.

use serde::Serialize;

use crate::catalog::{AttendantIndex, PriceIndex};
use crate::model::{DispenserGroup, NozzleCode, RawReading, TagId};
use crate::store::RawReadingStore;

/// Enrichment output for one dispenser.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub attendant_name: Option<String>,
    pub attendant_photo_url: Option<String>,
    pub calculated_liters: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct EnrichmentResolver {
    cash_scale: f64,
}

impl EnrichmentResolver {
    pub fn new(cash_scale: f64) -> Self {
        Self { cash_scale }
    }

    pub fn enrich(
        &self,
        group: &DispenserGroup,
        store: &RawReadingStore,
        directory: &AttendantIndex,
        prices: &PriceIndex,
    ) -> Enrichment {
        let tagged = Self::resolve_tag(group, store);
        let attendant = tagged
            .as_ref()
            .and_then(|(_, tag, _)| directory.lookup(tag));

        // Cash comes from the reading that carried the tag, else from the
        // active nozzle itself.
        let cash_reading = match tagged {
            Some((_, _, reading)) => Some(reading),
            None => group.active_nozzle.as_ref().and_then(|a| store.get(a.code)),
        };

        let calculated_liters = group.active_nozzle.as_ref().and_then(|active| {
            let price = prices.unit_price(&active.product)?;
            self.liters(cash_reading.as_ref()?.cash, price)
        });

        Enrichment {
            attendant_name: attendant.map(|a| a.name.clone()),
            attendant_photo_url: attendant.and_then(|a| a.photo_url.clone()),
            calculated_liters,
        }
    }

    /// Active nozzle's tag first, then the first tagged member in order.
    fn resolve_tag(
        group: &DispenserGroup,
        store: &RawReadingStore,
    ) -> Option<(NozzleCode, TagId, RawReading)> {
        let tagged = |code: NozzleCode| {
            let reading = store.get(code)?;
            let tag = reading.tag.clone()?;
            Some((code, tag, reading))
        };

        group
            .active_nozzle
            .as_ref()
            .and_then(|active| tagged(active.code))
            .or_else(|| group.members.iter().find_map(|m| tagged(m.code)))
    }

    /// `cash × scale ÷ price`, or `None` when that is not a finite number.
    pub fn liters(&self, cash: f64, unit_price: f64) -> Option<f64> {
        if !(unit_price.is_finite() && unit_price > 0.0) {
            return None;
        }
        let liters = cash * self.cash_scale / unit_price;
        liters.is_finite().then_some(liters)
    }
}
