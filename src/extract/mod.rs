//! Field extractors
//!
//! Typed accessors over parsed records, one module per family. Checks ask
//! these for "all keyword sets", "the temporal extent" or "all links"
//! instead of walking the record themselves.

pub mod wcmp1;
pub mod wcmp2;

pub use wcmp1::{KeywordSet, TextValue, Wcmp1Fields, WMO_CODELISTS};
pub use wcmp2::{Contact, Link, Theme, TimeExtent, Wcmp2Fields};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Leniently parse a timestamp, assuming UTC when no offset is given
///
/// Accepts RFC 3339 as well as date-time, date, year-month and year forms
/// with or without a trailing `Z`.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = text.strip_suffix('Z').unwrap_or(text);
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y%m%dT%H%M%S",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }

    let date = NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", naive), "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01-01", naive), "%Y-%m-%d"))
        .ok()?;
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}
