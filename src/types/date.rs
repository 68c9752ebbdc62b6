// src/types/date.rs

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ParseError;

/// A server-assigned timestamp such as `createdAt`.
///
/// Top-level timestamps arrive as bare ISO 8601 strings; dates nested in objects arrive as
/// `{"__type": "Date", "iso": "..."}`. Both are accepted by [`ParseDate::from_value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDate {
    pub iso: String,
}

impl ParseDate {
    pub fn new(iso_string: impl Into<String>) -> Self {
        ParseDate {
            iso: iso_string.into(),
        }
    }

    pub fn iso(&self) -> &str {
        &self.iso
    }

    /// Reads either wire form of a date.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ParseDate::new(s.clone())),
            Value::Object(map) => map
                .get("iso")
                .and_then(Value::as_str)
                .map(ParseDate::new),
            _ => None,
        }
    }

    /// Parses the ISO string into a UTC timestamp.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, ParseError> {
        DateTime::parse_from_rfc3339(&self.iso)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                ParseError::UnexpectedResponse(format!("invalid date '{}': {}", self.iso, e))
            })
    }

    /// The `{"__type": "Date"}` form used when sending a date as a field value.
    pub fn to_typed_value(&self) -> Value {
        serde_json::json!({ "__type": "Date", "iso": self.iso })
    }
}

impl From<DateTime<Utc>> for ParseDate {
    fn from(value: DateTime<Utc>) -> Self {
        ParseDate::new(value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl<'de> Deserialize<'de> for ParseDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ParseDate::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("expected an ISO date string or Date object"))
    }
}

impl Serialize for ParseDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.iso)
    }
}
