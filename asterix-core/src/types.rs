//! Shared types, error taxonomy, and the decoded record model.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Fatal, stream-ending errors.
///
/// These mean the byte stream itself is misaligned or exhausted: there is no
/// safe resynchronization point, so the stream decoder stops. Everything
/// recoverable lives in [`Diagnostics`] instead.
#[derive(Debug, Error)]
pub enum AsterixError {
    #[error("truncated header: need 3 bytes at offset {offset}, {available} remain")]
    TruncatedHeader { offset: usize, available: usize },
    #[error("truncated FSPEC at offset {offset}")]
    TruncatedFspec { offset: usize },
    #[error(
        "truncated record body: {declared} bytes declared at offset {offset}, {available} remain"
    )]
    TruncatedRecordBody {
        offset: usize,
        declared: usize,
        available: usize,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AsterixError>;

// ---------------------------------------------------------------------------
// Item-level failure
// ---------------------------------------------------------------------------

/// Short read inside a single data item.
///
/// Never propagated as a stream error: the record orchestrator folds it into
/// the record's diagnostics and stops the item walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortRead {
    pub needed: usize,
    pub available: usize,
}

impl fmt::Display for ShortRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "need {} bytes, {} available", self.needed, self.available)
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A data item that failed to decode, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeFailure {
    pub item: String,
    pub message: String,
}

/// Anomalies observed while decoding one record.
///
/// An item identifier appears either in `Record::items` or here, never both.
/// Each condition also stops the item walk for the record it occurs in;
/// subsequent records are unaffected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Category not in the UAP registry: the whole data region, as hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_category: Option<String>,
    /// FSPEC carried a set bit past the end of the category's UAP.
    pub excess_fspec_bit: bool,
    /// No decoder registered for this item identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_decoder: Option<String>,
    /// Item whose decode ran past the record's declared length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overflow: Option<String>,
    /// Item whose decoder reported a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<DecodeFailure>,
    /// Bytes between the last decoded item and the declared end, as hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undecoded_tail: Option<String>,
}

impl Diagnostics {
    /// True if the record decoded without any anomaly.
    pub fn is_clean(&self) -> bool {
        self.unknown_category.is_none()
            && !self.excess_fspec_bit
            && self.missing_decoder.is_none()
            && self.overflow.is_none()
            && self.decode_error.is_none()
            && self.undecoded_tail.is_none()
    }

    /// Short labels of the conditions present, for one-line logging.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.unknown_category.is_some() {
            labels.push("unknown-category");
        }
        if self.excess_fspec_bit {
            labels.push("excess-fspec-bit");
        }
        if self.missing_decoder.is_some() {
            labels.push("missing-decoder");
        }
        if self.overflow.is_some() {
            labels.push("overflow");
        }
        if self.decode_error.is_some() {
            labels.push("decode-error");
        }
        if self.undecoded_tail.is_some() {
            labels.push("undecoded-tail");
        }
        labels
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One decoded wire record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Data category (0-255), selects the UAP and decoder set.
    pub category: u8,
    /// Record length from the wire header, 3-byte header included.
    pub declared_len: usize,
    /// The raw presence bitmap, preserved verbatim as lowercase hex.
    pub fspec_hex: String,
    /// Successfully decoded items, keyed by identifier (e.g. "I048/040").
    pub items: BTreeMap<String, Value>,
    pub diagnostics: Diagnostics,
}

impl Record {
    /// Decoded value of one item, if present.
    pub fn item(&self, id: &str) -> Option<&Value> {
        self.items.get(id)
    }

    /// Numeric sub-field of one item (e.g. `field_f64("I048/040", "range_nm")`).
    pub fn field_f64(&self, id: &str, key: &str) -> Option<f64> {
        self.items.get(id)?.get(key)?.as_f64()
    }

    /// Unsigned sub-field of one item.
    pub fn field_u64(&self, id: &str, key: &str) -> Option<u64> {
        self.items.get(id)?.get(key)?.as_u64()
    }

    /// String sub-field of one item.
    pub fn field_str(&self, id: &str, key: &str) -> Option<&str> {
        self.items.get(id)?.get(key)?.as_str()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_read_display() {
        let e = ShortRead {
            needed: 4,
            available: 1,
        };
        assert_eq!(e.to_string(), "need 4 bytes, 1 available");
    }

    #[test]
    fn test_diagnostics_clean() {
        let d = Diagnostics::default();
        assert!(d.is_clean());
        assert!(d.labels().is_empty());
    }

    #[test]
    fn test_diagnostics_labels() {
        let d = Diagnostics {
            excess_fspec_bit: true,
            missing_decoder: Some("I048/130".into()),
            ..Diagnostics::default()
        };
        assert!(!d.is_clean());
        assert_eq!(d.labels(), vec!["excess-fspec-bit", "missing-decoder"]);
    }

    #[test]
    fn test_record_field_access() {
        let mut items = BTreeMap::new();
        items.insert(
            "I048/040".to_string(),
            json!({"range_nm": 10.0, "bearing_deg": 90.0}),
        );
        items.insert("I048/220".to_string(), json!({"icao24": "AABBCC"}));
        let record = Record {
            category: 48,
            declared_len: 13,
            fspec_hex: "a0".into(),
            items,
            diagnostics: Diagnostics::default(),
        };

        assert_eq!(record.field_f64("I048/040", "range_nm"), Some(10.0));
        assert_eq!(record.field_str("I048/220", "icao24"), Some("AABBCC"));
        assert_eq!(record.field_f64("I048/090", "flight_level"), None);
        assert_eq!(record.field_u64("I048/040", "bearing_deg"), None); // float, not u64
    }
}
