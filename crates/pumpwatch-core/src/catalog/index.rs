// ── Lookup indexes ──

use std::collections::HashMap;

use crate::model::{AttendantIdentity, ProductPrice, TagId};

/// Attendants keyed by normalized tag.
#[derive(Debug, Clone, Default)]
pub struct AttendantIndex {
    by_tag: HashMap<TagId, AttendantIdentity>,
}

impl AttendantIndex {
    /// Inactive records and records without a tag are skipped. When two
    /// records share a tag the first one wins.
    pub fn from_records(records: impl IntoIterator<Item = AttendantIdentity>) -> Self {
        let mut by_tag = HashMap::new();
        for record in records {
            if !record.active {
                continue;
            }
            let Some(tag) = record.tag.clone() else {
                continue;
            };
            if by_tag.contains_key(&tag) {
                tracing::debug!(%tag, name = %record.name, "duplicate attendant tag ignored");
                continue;
            }
            by_tag.insert(tag, record);
        }
        Self { by_tag }
    }

    pub fn lookup(&self, tag: &TagId) -> Option<&AttendantIdentity> {
        self.by_tag.get(tag)
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

/// Unit prices keyed by lower-cased product name.
#[derive(Debug, Clone, Default)]
pub struct PriceIndex {
    by_product: HashMap<String, f64>,
}

impl PriceIndex {
    /// Non-positive and non-finite prices are left out, which disables
    /// liters computation for that product.
    pub fn from_records(records: impl IntoIterator<Item = ProductPrice>) -> Self {
        let by_product = records
            .into_iter()
            .filter(|p| {
                let usable = p.unit_price.is_finite() && p.unit_price > 0.0;
                if !usable {
                    tracing::debug!(product = %p.product_name, price = p.unit_price, "unusable unit price");
                }
                usable
            })
            .map(|p| (p.product_name.trim().to_lowercase(), p.unit_price))
            .collect();
        Self { by_product }
    }

    /// Case-insensitive price lookup.
    pub fn unit_price(&self, product: &str) -> Option<f64> {
        self.by_product.get(&product.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.by_product.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_product.is_empty()
    }
}
