// ── Reading storage ──
//
// Lock-free per-nozzle storage with push-based change notification.

mod reading_store;

pub use reading_store::RawReadingStore;
