//! Zone designator parsing.

use chrono::FixedOffset;

use crate::error::{Error, Result};

const SECONDS_PER_HOUR: i32 = 3600;
const SECONDS_PER_MINUTE: i32 = 60;

/// Parse a trailing zone token.
///
/// Accepted shapes are `Z`, `Z` followed by a four digit offset echo
/// (`Z0700`, where the designator wins), and signed offsets `±HH`, `±HMM`,
/// `±HHMM` or `±HH:MM`. Anything else yields `None`.
pub(crate) fn parse_zone(token: &str) -> Option<FixedOffset> {
    let bytes = token.as_bytes();
    match bytes {
        [b'Z'] => FixedOffset::east_opt(0),
        [b'Z', echo @ ..] if echo.len() == 4 && all_digits(echo) => FixedOffset::east_opt(0),
        [sign @ (b'+' | b'-'), rest @ ..] => {
            let (hours, minutes) = match rest.len() {
                2 => (number(rest)?, 0),
                3 => (number(&rest[..1])?, number(&rest[1..])?),
                4 => (number(&rest[..2])?, number(&rest[2..])?),
                5 if rest[2] == b':' => (number(&rest[..2])?, number(&rest[3..])?),
                _ => return None,
            };
            if hours >= 24 || minutes >= 60 {
                return None;
            }
            let seconds = hours * SECONDS_PER_HOUR + minutes * SECONDS_PER_MINUTE;
            if *sign == b'-' {
                FixedOffset::west_opt(seconds)
            } else {
                FixedOffset::east_opt(seconds)
            }
        }
        _ => None,
    }
}

/// Parse a configured reference offset such as `UTC`, `Z` or `+03:00`.
pub fn parse_offset(text: &str) -> Result<FixedOffset> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| Error::InvalidOffset(text.to_string()));
    }
    parse_zone(trimmed).ok_or_else(|| Error::InvalidOffset(text.to_string()))
}

fn all_digits(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit)
}

fn number(bytes: &[u8]) -> Option<i32> {
    if !all_digits(bytes) {
        return None;
    }
    Some(
        bytes
            .iter()
            .fold(0, |acc, b| acc * 10 + i32::from(b - b'0')),
    )
}
