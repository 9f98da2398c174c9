//! Courier common core: the codec building blocks shared by the HTTP pipeline.

pub mod codec;
pub mod error;
pub mod permissive;
pub mod primitive;
pub mod query;
pub mod timestamp;

pub use codec::{DateDecoding, DateEncoding};
pub use error::{Error, Result};
pub use permissive::{deserialize_or_unparsed, Permissive, Unparsed};
pub use primitive::Primitive;
pub use query::{QueryParam, QueryParameters, QueryValue, ToQueryParameters};
pub use timestamp::{Timestamp, TimestampCandidate, TimestampFormat, TimestampParser};
