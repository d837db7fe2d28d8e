//! Shorthand duration literals such as `30m`, `1h30m`, `1.5h` or `250ms`.
//!
//! The grammar follows the common Go style: an optional leading sign followed
//! by one or more `<decimal><unit>` groups. Only strictly positive durations
//! that fit in a signed 64-bit nanosecond count are accepted.

use std::time::Duration;
use thiserror::Error;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;
const MAX_NANOS: u64 = i64::MAX as u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration {0:?}")]
    Invalid(String),

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {literal:?}")]
    UnknownUnit { unit: String, literal: String },

    #[error("duration {0:?} must be greater than zero")]
    NotPositive(String),

    #[error("duration {0:?} is out of range")]
    Overflow(String),
}

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Split `s` after the longest prefix whose chars satisfy `pred`.
fn split_while(s: &str, pred: impl Fn(char) -> bool) -> (&str, &str) {
    let end = s.find(|c: char| !pred(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// Parse a shorthand duration literal.
///
/// Units are case sensitive; callers that accept user input normalize it
/// to lowercase first.
pub fn parse_duration(literal: &str) -> Result<Duration, DurationError> {
    if literal.is_empty() {
        return Err(DurationError::Empty);
    }
    let invalid = || DurationError::Invalid(literal.to_string());
    let overflow = || DurationError::Overflow(literal.to_string());

    let (negative, mut rest) = match literal.as_bytes()[0] {
        b'-' => (true, &literal[1..]),
        b'+' => (false, &literal[1..]),
        _ => (false, literal),
    };

    if rest == "0" {
        return Err(DurationError::NotPositive(literal.to_string()));
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        let (whole_digits, after) = split_while(rest, |c| c.is_ascii_digit());
        rest = after;
        let whole: u64 = if whole_digits.is_empty() {
            0
        } else {
            whole_digits.parse().map_err(|_| overflow())?
        };

        // Fraction digits beyond what fits are dropped, not rejected.
        let mut fraction: u64 = 0;
        let mut scale: f64 = 1.0;
        let mut fraction_digits = 0;
        if let Some(after_dot) = rest.strip_prefix('.') {
            let (digits, after) = split_while(after_dot, |c| c.is_ascii_digit());
            rest = after;
            fraction_digits = digits.len();
            for d in digits.bytes() {
                if fraction > (MAX_NANOS - 9) / 10 {
                    break;
                }
                fraction = fraction * 10 + u64::from(d - b'0');
                scale *= 10.0;
            }
        }
        if whole_digits.is_empty() && fraction_digits == 0 {
            return Err(invalid());
        }

        let (unit, after) = split_while(rest, |c| c != '.' && !c.is_ascii_digit());
        rest = after;
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(literal.to_string()));
        }
        let per_unit = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            literal: literal.to_string(),
        })?;

        let mut value = whole.checked_mul(per_unit).ok_or_else(overflow)?;
        if fraction > 0 {
            let partial = (fraction as f64 * (per_unit as f64 / scale)) as u64;
            value = value.checked_add(partial).ok_or_else(overflow)?;
        }
        total = total.checked_add(value).ok_or_else(overflow)?;
        if total > MAX_NANOS {
            return Err(overflow());
        }
    }

    if negative || total == 0 {
        return Err(DurationError::NotPositive(literal.to_string()));
    }
    Ok(Duration::from_nanos(total))
}
