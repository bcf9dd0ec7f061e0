// ── Station layout ──
//
// Immutable configuration data injected at construction: how many
// dispensers, how many nozzles each, which product every nozzle pumps
// and the status precedence used when a dispenser's nozzles disagree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{NozzleCode, NozzleStatus};

const UNKNOWN_PRODUCT: &str = "Unknown";

// ── StatusPriority ──────────────────────────────────────────────────

/// Status precedence, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusPriority([NozzleStatus; 9]);

impl StatusPriority {
    pub const DEFAULT: Self = Self([
        NozzleStatus::Fueling,
        NozzleStatus::Ready,
        NozzleStatus::Waiting,
        NozzleStatus::Busy,
        NozzleStatus::Blocked,
        NozzleStatus::Available,
        NozzleStatus::Error,
        NozzleStatus::Failure,
        NozzleStatus::NotConfigured,
    ]);

    pub fn new(order: [NozzleStatus; 9]) -> Self {
        Self(order)
    }

    /// Position in the order; lower outranks higher. A status missing
    /// from the order ranks after every listed one.
    pub fn rank(&self, status: NozzleStatus) -> usize {
        self.0
            .iter()
            .position(|s| *s == status)
            .unwrap_or(self.0.len())
    }

    /// Whether `candidate` strictly outranks `current`.
    pub fn outranks(&self, candidate: NozzleStatus, current: NozzleStatus) -> bool {
        self.rank(candidate) < self.rank(current)
    }

    pub fn order(&self) -> &[NozzleStatus; 9] {
        &self.0
    }
}

impl Default for StatusPriority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ── StationLayout ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationLayout {
    dispensers: u8,
    nozzles_per_dispenser: u8,
    products: BTreeMap<NozzleCode, String>,
    priority: StatusPriority,
}

impl StationLayout {
    /// A layout with no product table. Callers are expected to have
    /// checked that `dispensers * nozzles_per_dispenser` fits in a
    /// two-digit code.
    pub fn new(dispensers: u8, nozzles_per_dispenser: u8) -> Self {
        Self {
            dispensers,
            nozzles_per_dispenser,
            products: BTreeMap::new(),
            priority: StatusPriority::DEFAULT,
        }
    }

    /// The deployed forecourt: 10 dispensers of 3 nozzles each, pumping
    /// Super / Regular / Diesel, except nozzles 26 and 29 which dispense
    /// tax-exempt fuel.
    pub fn standard() -> Self {
        let mut layout = Self::new(10, 3);
        for code in layout.codes().collect::<Vec<_>>() {
            let product = match code.number() {
                26 | 29 => "Exonerado",
                n if n % 3 == 1 => "Super",
                n if n % 3 == 2 => "Regular",
                _ => "Diesel",
            };
            layout.products.insert(code, product.to_owned());
        }
        layout
    }

    /// Replace product names for individual nozzles.
    pub fn with_products(mut self, overrides: impl IntoIterator<Item = (NozzleCode, String)>) -> Self {
        self.products.extend(overrides);
        self
    }

    pub fn with_priority(mut self, priority: StatusPriority) -> Self {
        self.priority = priority;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn dispensers(&self) -> u8 {
        self.dispensers
    }

    pub fn nozzles_per_dispenser(&self) -> u8 {
        self.nozzles_per_dispenser
    }

    pub fn priority(&self) -> &StatusPriority {
        &self.priority
    }

    pub fn nozzle_count(&self) -> usize {
        usize::from(self.dispensers) * usize::from(self.nozzles_per_dispenser)
    }

    /// Every configured code, ascending.
    pub fn codes(&self) -> impl Iterator<Item = NozzleCode> + '_ {
        (1..=self.nozzle_count()).filter_map(|n| u8::try_from(n).ok().and_then(NozzleCode::new))
    }

    /// Member codes of dispenser `number` (1-based). Empty when out of range.
    pub fn members(&self, number: u8) -> Vec<NozzleCode> {
        if number == 0 || number > self.dispensers {
            return Vec::new();
        }
        let per = usize::from(self.nozzles_per_dispenser);
        let first = (usize::from(number) - 1) * per + 1;
        (first..first + per)
            .filter_map(|n| u8::try_from(n).ok().and_then(NozzleCode::new))
            .collect()
    }

    /// Owning dispenser of `code`, i.e. ⌈code / nozzles_per_dispenser⌉.
    pub fn dispenser_of(&self, code: NozzleCode) -> Option<u8> {
        let n = usize::from(code.number());
        if self.nozzles_per_dispenser == 0 || n > self.nozzle_count() {
            return None;
        }
        u8::try_from(n.div_ceil(usize::from(self.nozzles_per_dispenser))).ok()
    }

    pub fn contains(&self, code: NozzleCode) -> bool {
        self.dispenser_of(code).is_some()
    }

    /// Product pumped by `code`, or `"Unknown"` when unmapped.
    pub fn product(&self, code: NozzleCode) -> &str {
        self.products.get(&code).map_or(UNKNOWN_PRODUCT, String::as_str)
    }
}

impl Default for StationLayout {
    fn default() -> Self {
        Self::standard()
    }
}
