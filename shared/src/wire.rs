//! Serde helpers for the loosely-typed wire formats the server emits.
//!
//! Timestamps arrive either as epoch milliseconds or as RFC 3339 strings and
//! are held as `f64` milliseconds, the same unit `js_sys::Date::now()` yields.
//! Identifiers arrive as numbers or strings and are held as strings.

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(f64),
    Text(String),
}

impl RawTimestamp {
    fn into_millis<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            Self::Millis(ms) => Ok(ms),
            Self::Text(text) => {
                if let Ok(ms) = text.parse::<f64>() {
                    return Ok(ms);
                }
                DateTime::parse_from_rfc3339(&text)
                    .map(|t| t.timestamp_millis() as f64)
                    .map_err(|e| E::custom(format!("invalid timestamp {:?}: {}", text, e)))
            }
        }
    }
}

pub mod millis {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        RawTimestamp::deserialize(deserializer)?.into_millis()
    }
}

pub mod opt_millis {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ms) => serializer.serialize_some(ms),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<RawTimestamp>::deserialize(deserializer)? {
            Some(raw) => raw.into_millis().map(Some),
            None => Ok(None),
        }
    }
}

pub mod loose_id {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Stamped {
        #[serde(with = "millis")]
        at: f64,
        #[serde(default, with = "opt_millis")]
        until: Option<f64>,
        #[serde(with = "loose_id")]
        id: String,
    }

    #[test]
    fn test_timestamps_accept_millis_and_rfc3339() {
        let a: Stamped = serde_json::from_str(r#"{"at": 1000, "id": 7}"#).unwrap();
        assert_eq!(a.at, 1000.0);
        assert_eq!(a.until, None);
        assert_eq!(a.id, "7");

        let b: Stamped = serde_json::from_str(
            r#"{"at": "1970-01-01T00:00:02Z", "until": "1970-01-01T00:00:03.500Z", "id": "abc"}"#,
        )
        .unwrap();
        assert_eq!(b.at, 2000.0);
        assert_eq!(b.until, Some(3500.0));
        assert_eq!(b.id, "abc");
    }

    #[test]
    fn test_null_optional_timestamp() {
        let s: Stamped = serde_json::from_str(r#"{"at": 1, "until": null, "id": 1}"#).unwrap();
        assert_eq!(s.until, None);
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        assert!(serde_json::from_str::<Stamped>(r#"{"at": "yesterday", "id": 1}"#).is_err());
    }
}
