//! Lenient timestamp parsing for store-issued `created_at` values.
//!
//! Accepts RFC 3339 as well as the naive `YYYY-MM-DD HH:MM:SS[.fff]` form a
//! SQLite-backed store emits; naive values are interpreted as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Optional timestamp field. A value that cannot be parsed is treated like a
/// missing one, so a single bad record does not fail a whole listing.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let parsed = parse(&value);
        if parsed.is_none() {
            tracing::warn!(value = %value, "Ignoring unparseable timestamp");
        }
        parsed
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_accepted_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(parse("2024-05-06T07:08:09Z"), Some(expected));
        assert_eq!(parse("2024-05-06T09:08:09+02:00"), Some(expected));
        assert_eq!(parse("2024-05-06 07:08:09"), Some(expected));
        assert_eq!(parse("2024-05-06T07:08:09"), Some(expected));
        assert!(parse("2024-05-06 07:08:09.250").is_some());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse("yesterday"), None);
        assert_eq!(parse(""), None);
    }

    #[derive(Debug, Deserialize)]
    struct Stamped {
        #[serde(default, deserialize_with = "deserialize_opt")]
        created_at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_unparseable_value_reads_as_missing() {
        let stamped: Stamped = serde_json::from_str(r#"{"created_at": "not a date"}"#).unwrap();
        assert_eq!(stamped.created_at, None);

        let stamped: Stamped = serde_json::from_str(r#"{"created_at": null}"#).unwrap();
        assert_eq!(stamped.created_at, None);
    }
}
