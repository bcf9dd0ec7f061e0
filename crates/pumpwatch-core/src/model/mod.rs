// ── Domain model ──
//
// Canonical fuel-station types. Everything the engine consumes or
// produces is expressed in these, never in backend DTOs.

pub mod directory;
pub mod dispenser;
pub mod fueling;
pub mod nozzle;
pub mod pump;
pub mod reading;
pub mod transaction;

pub use directory::{AttendantIdentity, ProductPrice};
pub use dispenser::{ActiveNozzle, DispenserGroup, DispenserView};
pub use fueling::{ActiveFueling, NozzleView};
pub use nozzle::{InvalidNozzleCode, InvalidNozzleStatus, NozzleCode, NozzleReading, NozzleStatus};
pub use pump::{Identifier, MAX_PRESET_TIMEOUT, PresetLimit, PresetOrder, PriceLevel};
pub use reading::{RawReading, ReadingUpdate, TagId};
pub use transaction::{FuelingTransaction, HISTORY_TIME_FORMAT, HistoryQuery};
