use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::row::value_text;

pub const PLACEHOLDER: &str = "-";
pub const ACTIVE: &str = "Active";
pub const INACTIVE: &str = "Inactive";

const DATETIME_PATTERNS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Negative,
    Warning,
    Neutral,
}

/// One rendered table cell. The same cell feeds the screen and the csv export.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Badge { label: String, tone: Tone },
    Placeholder,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn badge(label: impl Into<String>, tone: Tone) -> Self {
        Cell::Badge {
            label: label.into(),
            tone,
        }
    }

    pub fn status(active: bool) -> Self {
        if active {
            Cell::badge(ACTIVE, Tone::Positive)
        } else {
            Cell::badge(INACTIVE, Tone::Negative)
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Cell::Text(s) => s,
            Cell::Badge { label, .. } => label,
            Cell::Placeholder => PLACEHOLDER,
        }
    }
}

/// Type based rendering for columns without a custom renderer.
pub fn default_cell(value: &Value) -> Cell {
    match value {
        Value::Bool(b) => Cell::status(*b),
        Value::Null => Cell::Placeholder,
        other => Cell::Text(value_text(other)),
    }
}

/// Parses `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DD HH:MM:SS`.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for pattern in DATETIME_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    parse_datetime(text).map(|dt| dt.date())
}

/// Formats a date value with `pattern`, keeping the raw text when it does not parse.
pub fn date_cell(value: &Value, pattern: &str, with_time: bool) -> Cell {
    if value.is_null() {
        return Cell::Placeholder;
    }
    let raw = value_text(value);
    match parse_datetime(&raw) {
        Some(dt) if with_time => Cell::Text(dt.format(pattern).to_string()),
        Some(dt) => Cell::Text(dt.date().format(pattern).to_string()),
        None => Cell::Text(raw),
    }
}

pub fn currency_cell(value: &Value, symbol: &str) -> Cell {
    if value.is_null() {
        return Cell::Placeholder;
    }
    match crate::row::value_number(value) {
        Some(amount) if amount < 0.0 => Cell::Text(format!("-{symbol}{:.2}", -amount)),
        Some(amount) => Cell::Text(format!("{symbol}{amount:.2}")),
        None => Cell::Text(value_text(value)),
    }
}

pub fn badge_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Placeholder,
        Value::Bool(b) => Cell::status(*b),
        other => {
            let label = value_text(other);
            let tone = match label.to_lowercase().as_str() {
                "active" | "completed" | "done" | "approved" | "open" => Tone::Positive,
                "inactive" | "cancelled" | "canceled" | "rejected" | "closed" => Tone::Negative,
                "pending" | "in progress" | "in_progress" | "on hold" => Tone::Warning,
                _ => Tone::Neutral,
            };
            Cell::Badge { label, tone }
        }
    }
}
