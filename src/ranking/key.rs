//! Sort key selection and numeric extraction.
//!
//! [`value`] is total: every record yields a finite number for every key.
//! Absent fields, nulls, booleans, containers, empty or non-numeric strings
//! and non-finite results all resolve to `0.0`. That includes `"Infinity"`
//! and overflowing literals such as `"1e999"`: they rank as zero rather than
//! ahead of every finite value.
//!
//! [`parse_float`] and [`parse_int`] expose the same parsing without the zero
//! fallback, for callers that must tell "absent" from "zero".

use serde_json::Value;

use crate::core::Trip;

/// Field a ranking is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// `analytics.tripDistanceKm`
    #[default]
    Distance,
    /// `analytics.tripSpeedKmh`
    Speed,
    /// `tripDuration`, read as whole seconds
    Duration,
    /// `fareAmount`
    Fare,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Distance => "distance",
            SortKey::Speed => "speed",
            SortKey::Duration => "duration",
            SortKey::Fare => "fare",
        }
    }
}

/// Unrecognized tokens select [`SortKey::Distance`].
impl From<&str> for SortKey {
    fn from(token: &str) -> Self {
        match token {
            "speed" => SortKey::Speed,
            "duration" => SortKey::Duration,
            "fare" => SortKey::Fare,
            _ => SortKey::Distance,
        }
    }
}

/// Direction of a ranking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Only the exact token `desc` selects descending order.
impl From<&str> for SortOrder {
    fn from(token: &str) -> Self {
        if token == "desc" {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

/// Numeric value of `trip` under `key`
pub fn value(trip: &Trip, key: SortKey) -> f64 {
    let analytics = trip.analytics.as_ref();
    match key {
        SortKey::Distance => float_of(analytics.and_then(|a| a.trip_distance_km.as_ref())),
        SortKey::Speed => float_of(analytics.and_then(|a| a.trip_speed_kmh.as_ref())),
        SortKey::Duration => int_of(trip.trip_duration.as_ref()),
        SortKey::Fare => float_of(trip.fare_amount.as_ref()),
    }
}

fn float_of(field: Option<&Value>) -> f64 {
    parse_float(field).unwrap_or(0.0)
}

fn int_of(field: Option<&Value>) -> f64 {
    parse_int(field).unwrap_or(0.0)
}

/// Finite decimal value of a raw field, `None` when it has none
pub(crate) fn parse_float(field: Option<&Value>) -> Option<f64> {
    let parsed = match field {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => float_prefix(s),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Finite integral value of a raw field, truncated toward zero
pub(crate) fn parse_int(field: Option<&Value>) -> Option<f64> {
    let parsed = match field {
        Some(Value::Number(n)) => n.as_f64().map(f64::trunc),
        Some(Value::String(s)) => int_prefix(s),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parse the longest leading decimal literal (`"12.5km"` -> 12.5)
fn float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = sign_len(bytes);

    let int_digits = digit_run(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digit_run(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let exp_start = end + 1;
        let exp_sign = sign_len(&bytes[exp_start..]);
        let exp_digits = digit_run(&bytes[exp_start + exp_sign..]);
        if exp_digits > 0 {
            end = exp_start + exp_sign + exp_digits;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Parse the longest leading integer literal (`"900.7"` -> 900)
fn int_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let sign = sign_len(bytes);
    let digits = digit_run(&bytes[sign..]);
    if digits == 0 {
        return None;
    }
    s[..sign + digits].parse::<f64>().ok()
}

fn sign_len(bytes: &[u8]) -> usize {
    usize::from(matches!(bytes.first(), Some(b'+') | Some(b'-')))
}

fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
