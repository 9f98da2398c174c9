//! Timestamp utilities.

mod parser;
mod zone;

pub use parser::{TimestampCandidate, TimestampFormat, TimestampParser};
pub use zone::parse_offset;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::codec::{current_date_encoding, decode_date, DateEncoding, EncodedDate};

/// A UTC timestamp that encodes and decodes through the active date strategies.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// From a DateTime.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the inner DateTime.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Extended ISO 8601 string with microsecond precision.
    pub fn to_iso8601(&self) -> String {
        match DateEncoding::Iso8601Micros.encode(&self.0) {
            EncodedDate::Text(text) => text,
            EncodedDate::Number(n) => n.to_string(),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match current_date_encoding().encode(&self.0) {
            EncodedDate::Text(text) => serializer.serialize_str(&text),
            EncodedDate::Number(n) => serializer.serialize_i64(n),
        }
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a textual timestamp")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        decode_date(v)
            .map(Timestamp)
            .ok_or_else(|| E::custom(format!("unrecognized timestamp: {v:?}")))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(TimestampVisitor)
    }
}

/// Serde helpers for plain `DateTime<Utc>` fields.
///
/// ```
/// use chrono::{DateTime, Utc};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Shipment {
///     #[serde(with = "courier_common_core::timestamp::lenient")]
///     shipped_at: DateTime<Utc>,
/// }
///
/// let shipment: Shipment = serde_json::from_str(r#"{"shipped_at":"2022-09-05"}"#).unwrap();
/// assert_eq!(shipment.shipped_at.to_rfc3339(), "2022-09-05T00:00:00+00:00");
/// ```
pub mod lenient {
    use super::Timestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        Timestamp(*dt).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        Timestamp::deserialize(deserializer).map(|ts| ts.0)
    }

    /// The same helpers for `Option<DateTime<Utc>>`.
    pub mod option {
        use super::Timestamp;
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            dt.map(Timestamp).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<Timestamp>::deserialize(deserializer).map(|ts| ts.map(|ts| ts.0))
        }
    }
}
