//! Typed music fixture records. Hand-edited JSON is loose, so counts and texts
//! are coerced on the way in rather than rejected.

use crate::errors::FixtureError;
use crate::models::{MusicCrownItem, MusicEvent, MusicPending};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventFixture {
    #[serde(default, deserialize_with = "coerce::text")]
    pub event_id: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub event_date: String,
    #[serde(default, deserialize_with = "coerce::count")]
    pub planned_count: i64,
    #[serde(default, deserialize_with = "coerce::count")]
    pub decided_count: i64,
    #[serde(default, deserialize_with = "coerce::text")]
    pub status: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrownItemFixture {
    #[serde(deserialize_with = "coerce::index")]
    pub timeline_index: i64,
    #[serde(default, deserialize_with = "coerce::text")]
    pub event_id: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub crown_date: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub title: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub card_received_date: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub note: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PendingFixture {
    #[serde(default, deserialize_with = "coerce::text")]
    pub pending_id: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub temp_code: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub title: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub reason: String,
}

/// Decodes one array element, naming it `label[index]` on failure.
pub fn decode<T: DeserializeOwned>(raw: &Value, label: &str, index: usize) -> Result<T, FixtureError> {
    T::deserialize(raw).map_err(|err| FixtureError::InvalidRecord {
        context: format!("{label}[{index}]"),
        message: err.to_string(),
    })
}

/// Natural keys must be present and truthy: `0`, `false` and `""` count as
/// missing even though they coerce to non-empty text.
fn require_key(value: String, key: &str, raw: &Value) -> Result<String, FixtureError> {
    let falsy = match raw.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::Number(number)) => number.as_f64().map_or(false, |n| n == 0.0),
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    };
    if falsy || value.is_empty() {
        return Err(FixtureError::MissingNaturalKey {
            key: key.to_string(),
            record: raw.to_string(),
        });
    }
    Ok(value)
}

impl EventFixture {
    pub fn into_row(self, raw: &Value) -> Result<MusicEvent, FixtureError> {
        Ok(MusicEvent {
            id: require_key(self.event_id, "event_id", raw)?,
            event_date: self.event_date,
            planned_count: self.planned_count,
            decided_count: self.decided_count,
            status: self.status,
            note: self.note,
        })
    }
}

impl From<CrownItemFixture> for MusicCrownItem {
    fn from(value: CrownItemFixture) -> Self {
        Self {
            timeline_index: value.timeline_index,
            event_id: value.event_id,
            crown_date: value.crown_date,
            title: value.title,
            card_received_date: value.card_received_date,
            note: value.note,
            reason: value.reason,
        }
    }
}

impl PendingFixture {
    pub fn into_row(self, raw: &Value) -> Result<MusicPending, FixtureError> {
        Ok(MusicPending {
            pending_id: require_key(self.pending_id, "pending_id", raw)?,
            temp_code: self.temp_code,
            title: self.title,
            reason: self.reason,
        })
    }
}

mod coerce {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
        })
    }

    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        match raw {
            None | Some(Value::Null) => Ok(0),
            Some(value) => integer(&value).map_err(D::Error::custom),
        }
    }

    pub fn index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        integer(&value).map_err(D::Error::custom)
    }

    fn integer(value: &Value) -> Result<i64, String> {
        match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().filter(|f| is_whole_i64(*f)).map(|f| f as i64))
                .ok_or_else(|| format!("expected an integer, got {number}")),
            Value::String(text) if text.trim().is_empty() => Ok(0),
            Value::String(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("expected a numeric string, got \"{text}\"")),
            Value::Bool(flag) => Ok(i64::from(*flag)),
            other => Err(format!("expected a number, got {other}")),
        }
    }

    /// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
    fn is_whole_i64(value: f64) -> bool {
        value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64
    }
}
