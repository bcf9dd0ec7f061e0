//! pumpwatch-core: dispenser state aggregation and enrichment.
//!
//! Thirty nozzles report independently through a slow status poll and a
//! fast reading feed (poll + push). This crate merges both feeds into a
//! [`RawReadingStore`], folds nozzles into dispenser groups under a fixed
//! status priority ([`DispenserAggregator`]), attaches attendant identity
//! and price-derived liters ([`EnrichmentResolver`]) and composes the
//! final per-dispenser records ([`ViewAssembler`]). The [`Monitor`] drives
//! it all from background tasks and publishes each recomputation; it also
//! sends tag-authorized presets and fetches fueling history.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod enrich;
pub mod error;
pub mod feed;
pub mod layout;
pub mod model;
pub mod monitor;
pub mod store;
pub mod stream;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use aggregate::DispenserAggregator;
pub use catalog::{AttendantIndex, CachedCatalog, CatalogSnapshot, PriceIndex};
pub use config::{MonitorConfig, TlsVerification};
pub use enrich::{Enrichment, EnrichmentResolver};
pub use error::CoreError;
pub use feed::StationFeed;
pub use layout::{StationLayout, StatusPriority};
pub use monitor::{ConnectionState, Monitor};
pub use store::RawReadingStore;
pub use stream::{ViewStream, ViewWatchStream};
pub use view::{StationView, ViewAssembler};

pub use model::{
    ActiveFueling, ActiveNozzle, AttendantIdentity, DispenserGroup, DispenserView,
    FuelingTransaction, HistoryQuery, Identifier, NozzleCode, NozzleReading, NozzleStatus,
    NozzleView, PresetLimit, PresetOrder, PriceLevel, ProductPrice, RawReading, ReadingUpdate,
    TagId,
};
