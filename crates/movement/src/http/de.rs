//! Lenient deserializers for form-encoded payloads where every scalar arrives as text.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

pub fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Bool(value) => Ok(value),
        Scalar::Int(value) => Ok(value != 0),
        Scalar::Float(value) => Ok(value != 0.0),
        Scalar::Text(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected a boolean, found '{other}'"
            ))),
        },
    }
}

pub fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Int(value) => Ok(value as f64),
        Scalar::Float(value) => Ok(value),
        Scalar::Text(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("expected a number, found '{raw}'"))),
        Scalar::Bool(_) => Err(serde::de::Error::custom("expected a number, found a boolean")),
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (the date part is kept).
pub fn calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|value| value.date_naive())
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "flexible_bool")]
        flag: bool,
        #[serde(deserialize_with = "flexible_f64")]
        size: f64,
        #[serde(deserialize_with = "calendar_date")]
        born: NaiveDate,
        #[serde(default, deserialize_with = "empty_string_as_none")]
        note: Option<String>,
    }

    #[test]
    fn text_scalars_are_coerced() {
        let probe: Probe = serde_json::from_value(json!({
            "flag": "true",
            "size": "5.5",
            "born": "1990-01-01",
            "note": "  ",
        }))
        .expect("probe parses");

        assert!(probe.flag);
        assert!((probe.size - 5.5).abs() < f64::EPSILON);
        assert_eq!(probe.born, NaiveDate::from_ymd_opt(1990, 1, 1).expect("valid"));
        assert!(probe.note.is_none());
    }

    #[test]
    fn native_json_scalars_are_accepted() {
        let probe: Probe = serde_json::from_value(json!({
            "flag": false,
            "size": 3,
            "born": "1990-01-01T00:00:00Z",
        }))
        .expect("probe parses");

        assert!(!probe.flag);
        assert!((probe.size - 3.0).abs() < f64::EPSILON);
        assert!(probe.note.is_none());
    }

    #[test]
    fn garbage_boolean_is_rejected() {
        let result = serde_json::from_value::<Probe>(json!({
            "flag": "maybe",
            "size": 1,
            "born": "1990-01-01",
        }));
        assert!(result.is_err());
    }
}
