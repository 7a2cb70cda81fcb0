//! Creatio date values
//!
//! Verbose OData serializes `Edm.DateTime` as `/Date(1652707200000)/`,
//! optionally with a `+0200` offset suffix. Newer endpoints send ISO
//! strings instead; both are accepted.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

static ODATA_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/Date\((-?\d+)(?:[+-]\d{4})?\)/$").expect("static regex")
});

/// The "no date" marker Creatio stores in empty date fields
pub fn is_empty_date(date: &DateTime<Utc>) -> bool {
    date.year() <= 1
}

/// Parse `/Date(ms)/` or an ISO-8601 timestamp
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Some(captures) = ODATA_DATE.captures(value) {
        let millis: i64 = captures.get(1)?.as_str().parse().ok()?;
        return Utc.timestamp_millis_opt(millis).single();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp the way Creatio expects date fields in request bodies
pub fn to_odata(date: &NaiveDateTime) -> String {
    date.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Serde adapter for optional date fields; unparseable values become `None`
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(parse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_odata_date() {
        let date = parse("/Date(1652707200000)/").unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2022-05-16");
    }

    #[test]
    fn test_odata_date_with_offset() {
        assert!(parse("/Date(1652707200000+0200)/").is_some());
    }

    #[test]
    fn test_iso_dates() {
        assert_eq!(
            parse("2024-03-01T08:30:00").unwrap().format("%H:%M").to_string(),
            "08:30"
        );
        assert!(parse("2024-03-01T08:30:00Z").is_some());
        assert!(parse("yesterday").is_none());
    }

    #[test]
    fn test_empty_date_marker() {
        let empty = parse("0001-01-01T00:00:00").unwrap();
        assert!(is_empty_date(&empty));
        assert!(!is_empty_date(&parse("/Date(0)/").unwrap()));
    }

    #[test]
    fn test_to_odata() {
        let dt = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        assert_eq!(to_odata(&dt), "2024-12-31T23:59:00");
    }
}
