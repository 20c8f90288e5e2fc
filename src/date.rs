//! Date helpers
//!
//! Parses the date expressions accepted for the highlighted "current day"
//! and formats the timestamps shown in exports and log lines.

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Weekday};
use crate::error::{Error, Result};

/// Date expression types
#[derive(Debug, Clone, PartialEq)]
pub enum DateExpression {
    /// Use today's date
    Today,
    /// Use an explicit date
    Explicit(NaiveDate),
    /// No date (empty/"none")
    None,
}

/// Parse a date expression string into a DateExpression
///
/// Supported formats:
/// - `""` or `"none"` → None
/// - `"today"` → Today
/// - `"2024-11-20"` → Explicit date (ISO format)
/// - `"11/20/2024"` → Explicit date (US format)
pub fn parse_date_expression(expr: &str) -> Result<DateExpression> {
    let expr = expr.trim();

    if expr.is_empty() || expr.eq_ignore_ascii_case("none") {
        return Ok(DateExpression::None);
    }

    if expr.eq_ignore_ascii_case("today") {
        return Ok(DateExpression::Today);
    }

    if let Ok(date) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return Ok(DateExpression::Explicit(date));
    }

    if let Ok(date) = NaiveDate::parse_from_str(expr, "%m/%d/%Y") {
        return Ok(DateExpression::Explicit(date));
    }

    Err(Error::InvalidDateExpression(format!("Unable to parse date expression: {}", expr)))
}

/// Resolve a DateExpression to an actual date (if applicable)
pub fn resolve_date(expr: &DateExpression) -> Option<NaiveDate> {
    match expr {
        DateExpression::None => None,
        DateExpression::Today => Some(Local::now().date_naive()),
        DateExpression::Explicit(date) => Some(*date),
    }
}

/// Number of days in the given month (1-based), 0 for an invalid month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.map(|n| n.signed_duration_since(first).num_days() as u32)
        .unwrap_or(31)
}

/// Saturday or Sunday
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Timestamp printed in the export header, e.g. `2026-10-18 14:05`
pub fn format_export_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// Timestamp prefix of log lines, truncated to milliseconds
pub fn format_log_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%H:%M:%S%.3f").to_string()
}
