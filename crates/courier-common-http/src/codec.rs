//! JSON encoder and decoder with configurable date strategies.

use bytes::Bytes;
use courier_common_core::codec::{with_date_decoding, with_date_encoding};
use courier_common_core::{DateDecoding, DateEncoding, TimestampParser};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::HttpError;

/// Serializes request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonEncoder {
    pub date_encoding: DateEncoding,
    pub pretty: bool,
}

impl JsonEncoder {
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, HttpError> {
        with_date_encoding(self.date_encoding, || {
            if self.pretty {
                serde_json::to_vec_pretty(value)
            } else {
                serde_json::to_vec(value)
            }
        })
        .map(Bytes::from)
        .map_err(|e| HttpError::Encode(e.to_string()))
    }
}

/// Deserializes response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonDecoder {
    pub date_decoding: DateDecoding,
}

impl JsonDecoder {
    /// Decoder whose lenient parser reads zone-less timestamps in `parser`'s
    /// reference offset.
    pub fn with_parser(parser: TimestampParser) -> Self {
        Self {
            date_decoding: DateDecoding::Lenient(parser),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, HttpError> {
        with_date_decoding(self.date_decoding, || serde_json::from_slice(body))
            .map_err(|e| HttpError::decode(&e, body))
    }
}
