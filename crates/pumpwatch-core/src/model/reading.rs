// ── Live readings ──
//
// Running totals and RFID tags reported per nozzle by the fast feed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::nozzle::NozzleCode;

// ── TagId ───────────────────────────────────────────────────────────

/// Normalized RFID tag: trimmed and upper-cased.
///
/// Tags arrive in mixed case from readers and the directory alike, so
/// both sides are normalized before matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    /// Normalize a raw tag. Blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── ReadingUpdate ───────────────────────────────────────────────────

/// Partial update from either reading channel.
///
/// `tag: None` means "this update does not know the tag", never
/// "the tag was cleared".
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingUpdate {
    pub code: NozzleCode,
    pub cash: f64,
    pub tag: Option<TagId>,
}

impl ReadingUpdate {
    pub fn new(code: NozzleCode, cash: f64, tag: Option<TagId>) -> Self {
        Self { code, cash, tag }
    }
}

// ── RawReading ──────────────────────────────────────────────────────

/// Latest merged reading for one nozzle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReading {
    /// Unscaled running total as reported upstream.
    pub cash: f64,
    pub tag: Option<TagId>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) refreshed: Instant,
}

impl RawReading {
    pub(crate) fn from_update(update: ReadingUpdate) -> Self {
        Self {
            cash: update.cash,
            tag: update.tag,
            updated_at: Utc::now(),
            refreshed: Instant::now(),
        }
    }

    /// Field-wise merge: cash always wins, tag only when present.
    pub(crate) fn merge(&mut self, update: ReadingUpdate) {
        self.cash = update.cash;
        if update.tag.is_some() {
            self.tag = update.tag;
        }
        self.updated_at = Utc::now();
        self.refreshed = Instant::now();
    }

    /// Positive cash contribution, scaled.
    pub fn scaled_cash(&self, scale: f64) -> Option<f64> {
        (self.cash > 0.0).then_some(self.cash * scale)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_trimmed_and_uppercased() {
        let tag = TagId::parse("  0a1b2c3d4e5f6789 ").unwrap();
        assert_eq!(tag.as_str(), "0A1B2C3D4E5F6789");
        assert!(TagId::parse("   ").is_none());
        assert!(TagId::parse("").is_none());
    }

    #[test]
    fn merge_keeps_tag_when_update_omits_it() {
        let code = NozzleCode::new(1).unwrap();
        let mut reading =
            RawReading::from_update(ReadingUpdate::new(code, 10.0, TagId::parse("abc")));
        reading.merge(ReadingUpdate::new(code, 20.0, None));
        assert_eq!(reading.cash, 20.0);
        assert_eq!(reading.tag, TagId::parse("ABC"));

        reading.merge(ReadingUpdate::new(code, 0.0, TagId::parse("def")));
        assert_eq!(reading.cash, 0.0);
        assert_eq!(reading.tag, TagId::parse("DEF"));
    }

    #[test]
    fn zero_cash_contributes_nothing() {
        let code = NozzleCode::new(1).unwrap();
        let reading = RawReading::from_update(ReadingUpdate::new(code, 0.0, None));
        assert!(reading.scaled_cash(1.0).is_none());

        let reading = RawReading::from_update(ReadingUpdate::new(code, 15.0, None));
        assert_eq!(reading.scaled_cash(100.0), Some(1500.0));
    }
}
