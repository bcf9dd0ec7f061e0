// ── Pump authorization ──
//
// A preset authorizes one nozzle for a single fueling under an
// attendant's tag, optionally capped by amount or volume.

use std::time::Duration;

use serde::Serialize;
use strum::EnumString;

use super::nozzle::NozzleCode;
use super::reading::TagId;
use crate::error::CoreError;

/// Longest authorization window the forecourt controller accepts.
pub const MAX_PRESET_TIMEOUT: Duration = Duration::from_secs(99);

/// How much the authorized fueling may dispense.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum PresetLimit {
    /// Currency amount.
    Amount(f64),
    /// Liters.
    Volume(f64),
    FullTank,
}

/// Who presents the tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString, strum::Display)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Identifier {
    #[default]
    Attendant,
    Customer,
}

/// Price level the fueling is billed at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString, strum::Display)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum PriceLevel {
    #[default]
    Cash,
    Credit,
    Debit,
}

impl Identifier {
    pub fn code(self) -> u8 {
        match self {
            Self::Attendant => 0,
            Self::Customer => 1,
        }
    }
}

impl PriceLevel {
    pub fn code(self) -> u8 {
        match self {
            Self::Cash => 0,
            Self::Credit => 1,
            Self::Debit => 2,
        }
    }
}

/// A validated-on-send preset authorization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetOrder {
    pub nozzle: NozzleCode,
    pub tag: TagId,
    pub limit: PresetLimit,
    pub identifier: Identifier,
    pub price_level: PriceLevel,
    /// How long the nozzle stays authorized waiting for a lift.
    #[serde(with = "secs")]
    pub timeout: Duration,
}

impl PresetOrder {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(nozzle: NozzleCode, tag: TagId, limit: PresetLimit) -> Self {
        Self {
            nozzle,
            tag,
            limit,
            identifier: Identifier::default(),
            price_level: PriceLevel::default(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        match self.limit {
            PresetLimit::Amount(value) | PresetLimit::Volume(value)
                if !(value.is_finite() && value > 0.0) =>
            {
                return Err(CoreError::InvalidRequest {
                    message: format!("preset value must be a positive number, got {value}"),
                });
            }
            _ => {}
        }
        if self.timeout > MAX_PRESET_TIMEOUT {
            return Err(CoreError::InvalidRequest {
                message: format!(
                    "preset timeout must be at most {}s",
                    MAX_PRESET_TIMEOUT.as_secs()
                ),
            });
        }
        Ok(())
    }
}

mod secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }
}
