// Boundary checks for request fields. Each helper returns the normalized value
// or a `FieldError` naming the offending field.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

static SLOT_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-1]?[0-9]|2[0-3]):([0-5][0-9])$").expect("slot time pattern")
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Trimmed text whose length (in chars) lies in `min..=max`.
pub fn text_in_range(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, FieldError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(FieldError::new(
            field,
            format!("must be between {min} and {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Optional free text capped at `max` chars. Blank becomes `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, FieldError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) if v.chars().count() > max => Err(FieldError::new(
            field,
            format!("must be at most {max} characters"),
        )),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Syntactically valid address, lower-cased.
pub fn email(field: &'static str, value: &str) -> Result<String, FieldError> {
    let normalized = value.trim().to_lowercase();
    if normalized.len() > 255 || !EMAIL.is_match(&normalized) {
        return Err(FieldError::new(field, "invalid email address"));
    }
    Ok(normalized)
}

/// Calendar date in `YYYY-MM-DD`.
pub fn slot_date(field: &'static str, value: &str) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| FieldError::new(field, "expected a date as YYYY-MM-DD"))
}

/// 24h `H:MM` or `HH:MM`. Seconds are not accepted.
pub fn slot_time(field: &'static str, value: &str) -> Result<NaiveTime, FieldError> {
    let invalid = || FieldError::new(field, "expected a time as HH:MM");
    let caps = SLOT_TIME.captures(value.trim()).ok_or_else(invalid)?;
    let hour: u32 = caps[1].parse().map_err(|_| invalid())?;
    let minute: u32 = caps[2].parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Minimum-length secret. Not trimmed.
pub fn password(field: &'static str, value: &str) -> Result<(), FieldError> {
    if value.chars().count() < 6 {
        return Err(FieldError::new(field, "must be at least 6 characters"));
    }
    Ok(())
}
