//! ISO 8601 duration parsing (`P1DT2H`, `PT20S`, `P2W`, ...).
//!
//! Calendar components are converted to seconds with fixed lengths: a year
//! is 365.25 days and a month is 30.44 days. Only the last component may
//! carry a fraction in strict ISO 8601, but fractions are accepted on any
//! component here.

use crate::error::CoreError;

const SECS_PER_MINUTE: f64 = 60.0;
const SECS_PER_HOUR: f64 = 3_600.0;
const SECS_PER_DAY: f64 = 86_400.0;
const SECS_PER_WEEK: f64 = 7.0 * SECS_PER_DAY;
const SECS_PER_MONTH: f64 = 30.44 * SECS_PER_DAY;
const SECS_PER_YEAR: f64 = 365.25 * SECS_PER_DAY;

/// Designators allowed before the `T` separator, in the order they must appear.
const DATE_UNITS: &[(char, f64)] = &[
    ('Y', SECS_PER_YEAR),
    ('M', SECS_PER_MONTH),
    ('W', SECS_PER_WEEK),
    ('D', SECS_PER_DAY),
];

/// Designators allowed after the `T` separator, in the order they must appear.
const TIME_UNITS: &[(char, f64)] = &[
    ('H', SECS_PER_HOUR),
    ('M', SECS_PER_MINUTE),
    ('S', 1.0),
];

/// Parse an ISO 8601 duration into seconds.
///
/// ```
/// use skylapse_core::duration::parse_iso8601_duration;
///
/// assert_eq!(parse_iso8601_duration("PT2H").unwrap(), 7200.0);
/// assert_eq!(parse_iso8601_duration("PT20S").unwrap(), 20.0);
/// assert_eq!(parse_iso8601_duration("P1DT30M").unwrap(), 88_200.0);
/// ```
pub fn parse_iso8601_duration(s: &str) -> Result<f64, CoreError> {
    let invalid = |why: &str| {
        CoreError::InvalidArgument(format!("Invalid ISO 8601 duration '{s}': {why}"))
    };

    let trimmed = s.trim();
    if trimmed.starts_with('-') {
        return Err(invalid("negative durations are not allowed"));
    }
    let rest = trimmed
        .strip_prefix('P')
        .ok_or_else(|| invalid("must start with 'P'"))?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((_, "")) => return Err(invalid("'T' must be followed by a time component")),
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut components = 0usize;
    let mut total = sum_components(date_part, DATE_UNITS, &mut components).map_err(|w| invalid(&w))?;
    if let Some(time) = time_part {
        total += sum_components(time, TIME_UNITS, &mut components).map_err(|w| invalid(&w))?;
    }

    if components == 0 {
        return Err(invalid("no components"));
    }
    Ok(total)
}

/// Sum `<number><designator>` pairs, enforcing designator order.
fn sum_components(
    part: &str,
    units: &[(char, f64)],
    components: &mut usize,
) -> Result<f64, String> {
    let mut total = 0.0;
    let mut number = String::new();
    // Index into `units` that the next designator must be at or after.
    let mut next_unit = 0usize;

    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            number.push(if c == ',' { '.' } else { c });
            continue;
        }

        let position = units[next_unit..]
            .iter()
            .position(|(designator, _)| *designator == c)
            .ok_or_else(|| format!("unexpected designator '{c}'"))?;
        let (_, secs) = units[next_unit + position];
        next_unit += position + 1;

        if number.is_empty() {
            return Err(format!("designator '{c}' has no value"));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid number '{number}'"))?;
        number.clear();

        total += value * secs;
        *components += 1;
    }

    if !number.is_empty() {
        return Err(format!("value '{number}' has no designator"));
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
