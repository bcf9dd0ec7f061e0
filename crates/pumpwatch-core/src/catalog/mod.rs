// ── Attendant directory and price table ──

mod cache;
mod index;

pub use cache::{CachedCatalog, CatalogRefresh, CatalogSnapshot};
pub use index::{AttendantIndex, PriceIndex};
