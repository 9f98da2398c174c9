//! Lenient multi-format timestamp parser.
//!
//! Backends emit dates in several incompatible textual shapes. The parser
//! tries a fixed sequence of grammars and the first match wins:
//!
//! 1. `YYYY-MM-DD` (only for inputs of at most 10 bytes)
//! 2. `YYYY-MM-DDTHH:MM:SS` followed by a zone
//! 3. `YYYY-MM-DDTHH:MM:SS.f` (1 to 9 fraction digits) followed by a zone
//! 4. `YYYY-MM-DDTHH:MM:SS` without a zone
//! 5. `YYYY-MM-DDTHH:MM:SS.ffffff` without a zone
//!
//! Inputs without a zone are read in the parser's reference offset.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc};

use super::zone::parse_zone;
use crate::error::{Error, Result};

const DATE_ONLY_MAX_LEN: usize = 10;
const DATE_TIME_LEN: usize = 19;
const LOCAL_FRACTION_DIGITS: usize = 6;
const MAX_FRACTION_DIGITS: usize = 9;

/// Precedence of the grammars tried for inputs longer than a plain date.
const LONG_FORMS: [TimestampFormat; 4] = [
    TimestampFormat::ZonedSeconds,
    TimestampFormat::ZonedFractional,
    TimestampFormat::LocalSeconds,
    TimestampFormat::LocalFractional,
];

/// The textual grammar a timestamp matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampFormat {
    /// `2022-09-05`
    DateOnly,
    /// `2022-09-05T10:35:08Z`, `2022-09-05T10:35:08+03:00`
    ZonedSeconds,
    /// `2022-09-05T10:35:08.217174Z`
    ZonedFractional,
    /// `2006-01-02T15:04:05`
    LocalSeconds,
    /// `2022-09-05T10:35:08.217174`
    LocalFractional,
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DateOnly => "date-only",
            Self::ZonedSeconds => "zoned",
            Self::ZonedFractional => "zoned-fractional",
            Self::LocalSeconds => "local",
            Self::LocalFractional => "local-fractional",
        };
        f.write_str(name)
    }
}

/// A raw timestamp together with the grammar that accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampCandidate {
    pub raw: String,
    pub format: TimestampFormat,
    pub instant: DateTime<Utc>,
}

/// Parses text into an absolute instant, trying each supported grammar in turn.
///
/// The parser is `Copy` and holds no mutable state, so it can be shared
/// freely between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampParser {
    reference: FixedOffset,
}

impl TimestampParser {
    /// Create a parser that reads zone-less inputs as UTC.
    pub fn new() -> Self {
        Self {
            reference: utc_offset(),
        }
    }

    /// Create a parser that reads zone-less inputs in the given offset.
    pub fn with_reference_offset(reference: FixedOffset) -> Self {
        Self { reference }
    }

    /// Offset applied to dates and local date-times.
    pub fn reference_offset(&self) -> FixedOffset {
        self.reference
    }

    /// Parse `text`, returning `None` when no grammar matches.
    pub fn parse(&self, text: &str) -> Option<DateTime<Utc>> {
        self.parse_candidate(text).map(|candidate| candidate.instant)
    }

    /// Parse `text` and report which grammar matched.
    pub fn parse_candidate(&self, text: &str) -> Option<TimestampCandidate> {
        let matched = if text.len() <= DATE_ONLY_MAX_LEN {
            self.parse_as(TimestampFormat::DateOnly, text)
                .map(|instant| (TimestampFormat::DateOnly, instant))
        } else {
            LONG_FORMS.iter().find_map(|format| {
                self.parse_as(*format, text).map(|instant| (*format, instant))
            })
        };

        matched.map(|(format, instant)| TimestampCandidate {
            raw: text.to_string(),
            format,
            instant,
        })
    }

    /// Parse `text`, failing with [`Error::InvalidTimestamp`] when no grammar matches.
    pub fn parse_strict(&self, text: &str) -> Result<DateTime<Utc>> {
        self.parse(text).ok_or_else(|| Error::timestamp(text))
    }

    /// Try a single grammar, ignoring precedence.
    pub fn parse_as(&self, format: TimestampFormat, text: &str) -> Option<DateTime<Utc>> {
        match format {
            TimestampFormat::DateOnly => {
                let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
                self.in_reference(date.and_hms_opt(0, 0, 0)?)
            }
            TimestampFormat::ZonedSeconds => {
                let (local, tail) = split_date_time(text)?;
                if tail.starts_with('.') {
                    return None;
                }
                in_offset(local, parse_zone(tail)?)
            }
            TimestampFormat::ZonedFractional => {
                let (local, tail) = split_date_time(text)?;
                let (nanos, digits, zone) = split_fraction(tail)?;
                if digits > MAX_FRACTION_DIGITS {
                    return None;
                }
                in_offset(local.with_nanosecond(nanos)?, parse_zone(zone)?)
            }
            TimestampFormat::LocalSeconds => {
                let (local, tail) = split_date_time(text)?;
                if !tail.is_empty() {
                    return None;
                }
                self.in_reference(local)
            }
            TimestampFormat::LocalFractional => {
                let (local, tail) = split_date_time(text)?;
                let (nanos, digits, rest) = split_fraction(tail)?;
                if digits != LOCAL_FRACTION_DIGITS || !rest.is_empty() {
                    return None;
                }
                self.in_reference(local.with_nanosecond(nanos)?)
            }
        }
    }

    fn in_reference(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        in_offset(local, self.reference)
    }
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self::new()
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

fn in_offset(local: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Split `YYYY-MM-DDTHH:MM:SS` from whatever follows it.
fn split_date_time(text: &str) -> Option<(NaiveDateTime, &str)> {
    let head = text.get(..DATE_TIME_LEN)?;
    let tail = text.get(DATE_TIME_LEN..)?;
    let local = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").ok()?;
    Some((local, tail))
}

/// Split a leading `.digits` fraction, returning nanoseconds, digit count and the rest.
fn split_fraction(tail: &str) -> Option<(u32, usize, &str)> {
    let fraction = tail.strip_prefix('.')?;
    let digits = fraction
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }

    let (numerals, rest) = fraction.split_at(digits);
    let nanos = numerals
        .bytes()
        .take(MAX_FRACTION_DIGITS)
        .chain(std::iter::repeat(b'0'))
        .take(MAX_FRACTION_DIGITS)
        .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
    Some((nanos, digits, rest))
}
