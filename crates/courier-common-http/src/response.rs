//! HTTP response types.

use bytes::Bytes;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::{body_snippet, HttpError};

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub status: u16,
    /// Header names are stored lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Media type without parameters, lowercased: `application/json` for
    /// `Application/JSON; charset=utf-8`.
    pub fn media_type(&self) -> Option<String> {
        self.content_type()
            .and_then(|value| value.split(';').next())
            .map(|essence| essence.trim().to_ascii_lowercase())
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    pub fn body_snippet(&self) -> String {
        body_snippet(&self.body)
    }

    /// Decode the body as JSON without any date strategy installed.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| HttpError::decode(&e, &self.body))
    }
}

/// Result of calls that expect no payload.
///
/// Decodes from any JSON value and encodes as `{}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Empty {}

impl Serialize for Empty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        serializer.serialize_map(Some(0))?.end()
    }
}

impl<'de> Deserialize<'de> for Empty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| Empty {})
    }
}

/// Request body marker for calls that send nothing.
///
/// Encodes to `null`, which the executor treats as "no body".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NoBody;
