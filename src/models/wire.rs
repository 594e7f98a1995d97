//! Lenient field readers for JSON written by other clients.
//!
//! Each reader accepts any JSON value and degrades to an empty or absent
//! value instead of failing, so a payload with a malformed field still
//! parses and is rejected by validation with a reason.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Identifier that may arrive as a string or a number
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Signed count; numeric strings are read, fractions truncate, anything else is 0
pub fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// RFC 3339 instant; unparseable or non-string values read as absent
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "string_or_number")]
        id: String,
        #[serde(default, deserialize_with = "lenient_count")]
        count: i64,
        #[serde(default, deserialize_with = "lenient_timestamp")]
        at: Option<DateTime<Utc>>,
    }

    fn read(json: &str) -> Fields {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_ids() {
        assert_eq!(read(r#"{"id":"7"}"#).id, "7");
        assert_eq!(read(r#"{"id":7}"#).id, "7");
        assert_eq!(read(r#"{"id":null}"#).id, "");
        assert_eq!(read(r#"{"id":[1]}"#).id, "");
        assert_eq!(read("{}").id, "");
    }

    #[test]
    fn test_counts() {
        assert_eq!(read(r#"{"count":2}"#).count, 2);
        assert_eq!(read(r#"{"count":-1}"#).count, -1);
        assert_eq!(read(r#"{"count":"3"}"#).count, 3);
        assert_eq!(read(r#"{"count":2.9}"#).count, 2);
        assert_eq!(read(r#"{"count":"many"}"#).count, 0);
        assert_eq!(read(r#"{"count":true}"#).count, 0);
    }

    #[test]
    fn test_timestamps() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(read(r#"{"at":"2025-03-01T09:00:00Z"}"#).at, Some(at));
        assert_eq!(read(r#"{"at":"2025-03-01T10:00:00+01:00"}"#).at, Some(at));
        assert_eq!(read(r#"{"at":""}"#).at, None);
        assert_eq!(read(r#"{"at":"yesterday"}"#).at, None);
        assert_eq!(read(r#"{"at":1740819600}"#).at, None);
    }
}
