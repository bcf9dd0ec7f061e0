// ── Nozzle identity and hardware state ──
//
// A nozzle is addressed by a two-digit code assigned at configuration
// time and reports one of nine discrete states. States are classified,
// never transitioned, here: the forecourt controller owns the machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{EnumIter, EnumString};
use thiserror::Error;

// ── NozzleCode ──────────────────────────────────────────────────────

/// Error for nozzle codes that are not a number in `1..=99`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid nozzle code {0:?} (expected 01..99)")]
pub struct InvalidNozzleCode(pub String);

/// Two-digit nozzle code (`"01"`..`"99"`), ordered numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NozzleCode(u8);

impl NozzleCode {
    pub const MAX: u8 = 99;

    pub fn new(number: u8) -> Option<Self> {
        (1..=Self::MAX).contains(&number).then_some(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for NozzleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for NozzleCode {
    type Err = InvalidNozzleCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidNozzleCode(s.to_owned()))
    }
}

impl TryFrom<u32> for NozzleCode {
    type Error = InvalidNozzleCode;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidNozzleCode(value.to_string()))
    }
}

impl Serialize for NozzleCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NozzleCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self::try_from(n),
            Raw::Text(s) => s.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}

// ── NozzleStatus ────────────────────────────────────────────────────

/// Error for status integers outside `0..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("nozzle status {0} out of range (expected 0..8)")]
pub struct InvalidNozzleStatus(pub i64);

/// Hardware state reported for one nozzle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString,
    strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum NozzleStatus {
    /// No hardware assigned.
    NotConfigured,
    /// At rest, ready.
    Available,
    /// Requires software authorization.
    Blocked,
    /// Flow detected, totalizers running.
    Fueling,
    /// Lifted, waiting for authorization.
    Ready,
    /// Handshake or tag validation in progress.
    Waiting,
    /// Communication failure with the pump interface.
    Failure,
    /// Another nozzle on the same side is active.
    Busy,
    /// Generic error.
    Error,
}

impl NozzleStatus {
    /// Wire value used by the backend.
    pub fn code(self) -> u8 {
        match self {
            Self::NotConfigured => 0,
            Self::Available => 1,
            Self::Blocked => 2,
            Self::Fueling => 3,
            Self::Ready => 4,
            Self::Waiting => 5,
            Self::Failure => 6,
            Self::Busy => 7,
            NozzleStatus::Error => 8,
        }
    }

    /// Operator-facing label as printed on the forecourt console.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotConfigured => "No Configurado",
            Self::Available => "Libre",
            Self::Blocked => "Bloqueado",
            Self::Fueling => "Abasteciendo",
            Self::Ready => "Pronto",
            Self::Waiting => "Espera",
            Self::Failure => "Falla",
            Self::Busy => "Ocupado",
            NozzleStatus::Error => "Error",
        }
    }

    /// States in which no fueling episode is open, so no tag is retained.
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Available | Self::NotConfigured)
    }

    /// States in which the forecourt controller accepts a preset.
    pub fn accepts_preset(self) -> bool {
        matches!(self, Self::Available | Self::Blocked)
    }
}

impl TryFrom<i64> for NozzleStatus {
    type Error = InvalidNozzleStatus;

    fn try_from(value: i64) -> Result<Self, InvalidNozzleStatus> {
        Ok(match value {
            0 => NozzleStatus::NotConfigured,
            1 => NozzleStatus::Available,
            2 => NozzleStatus::Blocked,
            3 => NozzleStatus::Fueling,
            4 => NozzleStatus::Ready,
            5 => NozzleStatus::Waiting,
            6 => NozzleStatus::Failure,
            7 => NozzleStatus::Busy,
            8 => NozzleStatus::Error,
            other => return Err(InvalidNozzleStatus(other)),
        })
    }
}

impl TryFrom<u8> for NozzleStatus {
    type Error = InvalidNozzleStatus;

    fn try_from(value: u8) -> Result<Self, InvalidNozzleStatus> {
        Self::try_from(i64::from(value))
    }
}

// ── NozzleReading ───────────────────────────────────────────────────

/// One nozzle's entry in a status snapshot. Replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NozzleReading {
    pub code: NozzleCode,
    pub status: NozzleStatus,
    /// From the static nozzle → product table, not from upstream.
    pub product: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn code_parses_padded_and_bare() {
        assert_eq!("01".parse::<NozzleCode>().unwrap().number(), 1);
        assert_eq!(" 7 ".parse::<NozzleCode>().unwrap().number(), 7);
        assert_eq!(NozzleCode::new(30).unwrap().to_string(), "30");
        assert_eq!(NozzleCode::new(3).unwrap().to_string(), "03");
    }

    #[test]
    fn code_rejects_zero_and_overflow() {
        assert!("00".parse::<NozzleCode>().is_err());
        assert!("100".parse::<NozzleCode>().is_err());
        assert!("ab".parse::<NozzleCode>().is_err());
        assert!(NozzleCode::try_from(300_u32).is_err());
    }

    #[test]
    fn code_serde_accepts_number_or_string() {
        let a: NozzleCode = serde_json::from_str("\"05\"").unwrap();
        let b: NozzleCode = serde_json::from_str("5").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"05\"");
    }

    #[test]
    fn status_round_trips_wire_codes() {
        for status in NozzleStatus::iter() {
            assert_eq!(NozzleStatus::try_from(status.code()).unwrap(), status);
        }
        assert_eq!(NozzleStatus::try_from(9_i64), Err(InvalidNozzleStatus(9)));
        assert_eq!(NozzleStatus::try_from(-1_i64), Err(InvalidNozzleStatus(-1)));
    }

    #[test]
    fn status_labels() {
        assert_eq!(NozzleStatus::Available.label(), "Libre");
        assert_eq!(NozzleStatus::Fueling.label(), "Abasteciendo");
        assert_eq!(NozzleStatus::NotConfigured.label(), "No Configurado");
    }

    #[test]
    fn only_hung_up_states_are_idle() {
        let idle: Vec<_> = NozzleStatus::iter().filter(|s| s.is_idle()).collect();
        assert_eq!(idle, vec![NozzleStatus::NotConfigured, NozzleStatus::Available]);
        assert!(!NozzleStatus::Failure.is_idle());
    }

    #[test]
    fn presets_need_an_available_or_blocked_nozzle() {
        assert!(NozzleStatus::Available.accepts_preset());
        assert!(NozzleStatus::Blocked.accepts_preset());
        assert!(!NozzleStatus::Fueling.accepts_preset());
        assert!(!NozzleStatus::NotConfigured.accepts_preset());
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("fueling".parse::<NozzleStatus>().unwrap(), NozzleStatus::Fueling);
    }
}
