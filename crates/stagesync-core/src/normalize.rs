//! Scalar normalization shared by ingestion and aggregation.
//!
//! Upstream rows are loosely typed: ids arrive as numbers or numeric strings,
//! flags as booleans or words, dates in a handful of layouts. Every helper
//! here coerces a malformed value to `None`/`false` instead of failing, so a
//! single bad field never aborts processing of the rest of a record.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// ─── Plain helpers ───────────────────────────────────────────────────────────

/// Boolean-like string coercion.
///
/// Empty, `false`, `no` and `0` (trimmed, case-insensitive) are false;
/// every other non-empty string is true.
pub fn is_truthy(s: &str) -> bool {
  let s = s.trim();
  !(s.is_empty()
    || s.eq_ignore_ascii_case("false")
    || s.eq_ignore_ascii_case("no")
    || s == "0")
}

/// Trim a string, mapping whitespace-only input to `None`.
pub fn non_blank(s: Option<String>) -> Option<String> {
  let s = s?;
  let trimmed = s.trim();
  if trimmed.is_empty() {
    None
  } else if trimmed.len() == s.len() {
    Some(s)
  } else {
    Some(trimmed.to_owned())
  }
}

/// Parse a non-negative integer identity key.
pub fn parse_person_id(s: &str) -> Option<u64> { s.trim().parse().ok() }

/// Parse a calendar date, keeping only the date part of timestamps.
///
/// Accepted layouts: `2024-01-05`, `01/05/2024`, RFC 3339, and naive
/// `2024-01-05T10:00:00` / `2024-01-05 10:00:00` timestamps.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    return Some(d);
  }
  if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
    return Some(d);
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.date_naive());
  }
  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|dt| dt.date())
}

// ─── Lenient serde adapters ──────────────────────────────────────────────────
//
// Used with `#[serde(default, deserialize_with = "...")]`. Each accepts any
// JSON value and applies the coercion rules above.

fn lenient_value<'de, D>(d: D) -> Result<Value, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<Value>::deserialize(d)?.unwrap_or(Value::Null))
}

/// Numbers or numeric strings; anything else becomes `None`.
pub fn person_id<'de, D>(d: D) -> Result<Option<u64>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match lenient_value(d)? {
    Value::Number(n) => n.as_u64().or_else(|| {
      n.as_f64()
        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
        .map(|f| f as u64)
    }),
    Value::String(s) => parse_person_id(&s),
    _ => None,
  })
}

/// Date strings in any layout accepted by [`parse_date`].
pub fn date<'de, D>(d: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match lenient_value(d)? {
    Value::String(s) => parse_date(&s),
    _ => None,
  })
}

/// Booleans, numbers (non-zero is true) or truthy strings.
pub fn flag<'de, D>(d: D) -> Result<bool, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match lenient_value(d)? {
    Value::Bool(b) => b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    Value::String(s) => is_truthy(&s),
    _ => false,
  })
}

/// Free text; numbers are stringified, blanks become `None`.
pub fn text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match lenient_value(d)? {
    Value::String(s) => non_blank(Some(s)),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  })
}
