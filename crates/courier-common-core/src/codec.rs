//! Date strategies used while encoding and decoding JSON.
//!
//! `serde` gives a type no way to receive configuration, so the active
//! strategy lives in a thread-local slot for the duration of one synchronous
//! encode or decode. [`Timestamp`](crate::Timestamp), [`Primitive`](crate::Primitive)
//! and the [`lenient`](crate::timestamp::lenient) helpers read it. Other
//! threads, and therefore other in-flight calls, keep their own slot.

use std::cell::Cell;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::timestamp::TimestampParser;

/// How dates are rendered when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateEncoding {
    /// `2022-09-05T10:35:08.217174Z`
    #[default]
    Iso8601Micros,
    /// `2022-09-05T10:35:08Z`
    Iso8601Seconds,
    /// Whole seconds since the Unix epoch, as a JSON number.
    UnixSeconds,
    /// Milliseconds since the Unix epoch, as a JSON number.
    UnixMillis,
}

/// How textual dates are recognized when decoding.
///
/// Numeric dates are never recognized: numbers and dates would otherwise be
/// indistinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateDecoding {
    /// Try every grammar supported by [`TimestampParser`].
    Lenient(TimestampParser),
    /// Accept RFC 3339 only.
    Rfc3339Strict,
}

impl Default for DateDecoding {
    fn default() -> Self {
        Self::Lenient(TimestampParser::new())
    }
}

impl DateDecoding {
    /// Parse `text` with this strategy.
    pub fn parse(&self, text: &str) -> Option<DateTime<Utc>> {
        match self {
            Self::Lenient(parser) => parser.parse(text),
            Self::Rfc3339Strict => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// A rendered date: either text or an epoch number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedDate {
    Text(String),
    Number(i64),
}

impl DateEncoding {
    /// Render `instant` with this strategy.
    pub fn encode(&self, instant: &DateTime<Utc>) -> EncodedDate {
        match self {
            Self::Iso8601Micros => {
                EncodedDate::Text(instant.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            Self::Iso8601Seconds => {
                EncodedDate::Text(instant.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            Self::UnixSeconds => EncodedDate::Number(instant.timestamp()),
            Self::UnixMillis => EncodedDate::Number(instant.timestamp_millis()),
        }
    }
}

thread_local! {
    static ENCODING: Cell<DateEncoding> = Cell::new(DateEncoding::default());
    static DECODING: Cell<DateDecoding> = Cell::new(DateDecoding::default());
}

/// Restores the previous strategy when dropped, including on unwind.
struct Restore<T: Copy + 'static> {
    slot: &'static std::thread::LocalKey<Cell<T>>,
    previous: T,
}

impl<T: Copy + 'static> Drop for Restore<T> {
    fn drop(&mut self) {
        let previous = self.previous;
        self.slot.with(|cell| cell.set(previous));
    }
}

fn scoped<T: Copy + 'static, R>(
    slot: &'static std::thread::LocalKey<Cell<T>>,
    value: T,
    f: impl FnOnce() -> R,
) -> R {
    let previous = slot.with(|cell| cell.replace(value));
    let _restore = Restore { slot, previous };
    f()
}

/// Run `f` with `encoding` installed as the date encoding strategy.
pub fn with_date_encoding<R>(encoding: DateEncoding, f: impl FnOnce() -> R) -> R {
    scoped(&ENCODING, encoding, f)
}

/// Run `f` with `decoding` installed as the date decoding strategy.
pub fn with_date_decoding<R>(decoding: DateDecoding, f: impl FnOnce() -> R) -> R {
    scoped(&DECODING, decoding, f)
}

/// The date encoding strategy active on this thread.
pub fn current_date_encoding() -> DateEncoding {
    ENCODING.with(Cell::get)
}

/// The date decoding strategy active on this thread.
pub fn current_date_decoding() -> DateDecoding {
    DECODING.with(Cell::get)
}

/// Parse `text` with the active decoding strategy.
pub fn decode_date(text: &str) -> Option<DateTime<Utc>> {
    current_date_decoding().parse(text)
}
