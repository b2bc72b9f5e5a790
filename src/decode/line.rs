// Line tokenizer and value parsers shared by the decoders

use crate::error::LineError;
use std::time::Duration;

/// What a stats line turned out to be
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StatLine<'a> {
    /// Blank, comment, or JSON punctuation
    Structural,
    Pair { name: &'a str, value: &'a str },
}

/// Split a stats line into name and raw value
///
/// Accepts `name value`, `name, value`, `name: value` and the one-entry-per-
/// line JSON layout `"name": value,`.
pub(crate) fn split_stat_line(line: &str) -> Result<StatLine<'_>, LineError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || matches!(line, "{" | "}" | "}," | "[" | "]")
    {
        return Ok(StatLine::Structural);
    }
    let line = line.strip_suffix(',').unwrap_or(line).trim_end();

    let (name, rest) = if let Some(quoted) = line.strip_prefix('"') {
        let end = quoted.find('"').ok_or(LineError::MissingValue)?;
        (&quoted[..end], &quoted[end + 1..])
    } else {
        let end = line
            .find(|c: char| c.is_whitespace() || c == ':' || c == ',')
            .ok_or(LineError::MissingValue)?;
        (&line[..end], &line[end..])
    };

    let value = rest
        .trim_start_matches(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    if name.trim().is_empty() {
        return Err(LineError::EmptyName);
    }
    if value.is_empty() {
        return Err(LineError::MissingValue);
    }
    Ok(StatLine::Pair {
        name: name.trim(),
        value,
    })
}

pub(crate) fn parse_counter(value: &str) -> Result<u64, LineError> {
    value
        .parse::<u64>()
        .map_err(|_| LineError::InvalidCounter(value.to_string()))
}

/// Unit suffixes, longest match first; scale is nanoseconds per unit
const UNITS: &[(&str, u64)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
];

fn split_unit(value: &str) -> Option<(&str, u64)> {
    UNITS.iter().find_map(|(suffix, scale)| {
        value
            .strip_suffix(suffix)
            .map(|number| (number.trim_end(), *scale))
    })
}

/// Whether the value carries an explicit duration unit
pub(crate) fn has_duration_unit(value: &str) -> bool {
    split_unit(value).is_some_and(|(number, _)| number.parse::<f64>().is_ok())
}

/// Parse a duration; unit-less values are seconds
///
/// Integral values are converted exactly so that sums stay bit-exact.
pub(crate) fn parse_duration(value: &str) -> Result<Duration, LineError> {
    let invalid = || LineError::InvalidDuration(value.to_string());
    let (number, scale) = split_unit(value).unwrap_or((value, 1_000_000_000));

    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(scale)
            .map(Duration::from_nanos)
            .ok_or_else(invalid);
    }

    let float: f64 = number.parse().map_err(|_| invalid())?;
    if !float.is_finite() || float < 0.0 {
        return Err(invalid());
    }
    let nanos = (float * scale as f64).round();
    if nanos >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(nanos as u64))
}

/// Parse a non-negative, finite profile sample value
pub(crate) fn parse_sample(value: &str) -> Result<f64, LineError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(LineError::InvalidSample(value.to_string())),
    }
}

/// Last whitespace-separated token and everything before it
pub(crate) fn split_last_field(s: &str) -> Option<(&str, &str)> {
    let (head, tail) = s.trim_end().rsplit_once(char::is_whitespace)?;
    Some((head.trim_end(), tail))
}
