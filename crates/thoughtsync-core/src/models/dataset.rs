use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::api::SyncError;

/// A single thought or model entry.
///
/// The front end owns the record schema, so records are kept as open JSON
/// objects and only the handful of fields the sync layer reads are exposed
/// through accessors. Everything else round-trips untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

pub type Thought = Record;
pub type Model = Record;

impl Record {
    /// Record id, accepting either a string or a numeric id.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.0
            .get("title")
            .or_else(|| self.0.get("name"))
            .and_then(Value::as_str)
    }

    pub fn tags(&self) -> Vec<&str> {
        self.0
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// The synchronized payload.
///
/// Absent collections deserialize as empty ones. Unknown top-level fields are
/// kept in `extra` so a parse/serialize pair is lossless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default, deserialize_with = "null_as_default")]
    pub thoughts: Vec<Thought>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub models: Vec<Model>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Map<String, Value>,
    #[serde(
        rename = "lastUpdated",
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Record counts shown by status displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub thoughts: usize,
    pub models: usize,
    pub tags: usize,
}

impl Dataset {
    /// Parse a dataset from a JSON document.
    pub fn from_json(text: &str) -> Result<Self, SyncError> {
        serde_json::from_str(text).map_err(|e| SyncError::Parse(e.to_string()))
    }

    /// Parse a dataset from raw bytes (e.g. a cache file).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SyncError> {
        serde_json::from_slice(bytes).map_err(|e| SyncError::Parse(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, SyncError> {
        serde_json::to_string_pretty(self).map_err(|e| SyncError::Parse(e.to_string()))
    }

    /// The parsed `lastUpdated` timestamp, or `None` when absent or malformed.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.last_updated.as_deref()?.trim())
    }

    /// Set `lastUpdated` in the same shape browsers produce for ISO strings.
    pub fn stamp(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at.to_rfc3339_opts(SecondsFormat::Millis, true));
    }

    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            thoughts: self.thoughts.len(),
            models: self.models.len(),
            tags: self.tags.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.thoughts.is_empty() && self.models.is_empty() && self.tags.is_empty()
    }
}

/// Parse an ISO-8601 timestamp. Forms without an offset are read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Compact offsets such as +0000
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let midnight = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept any JSON scalar for `lastUpdated`. Non-string values are kept in
/// their textual form, which will not parse as a timestamp and therefore
/// counts as malformed during freshness comparison.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_full_dataset() {
        let json = r#"{
            "thoughts": [{"id": 1, "title": "First", "tags": ["rust", "sync"]}],
            "models": [{"id": "m1", "name": "Pyramid"}],
            "tags": {"rust": {"count": 1}},
            "lastUpdated": "2024-01-01T00:00:00Z"
        }"#;
        let dataset = Dataset::from_json(json).unwrap();
        assert_eq!(dataset.thoughts.len(), 1);
        assert_eq!(dataset.thoughts[0].id().as_deref(), Some("1"));
        assert_eq!(dataset.thoughts[0].tags(), vec!["rust", "sync"]);
        assert_eq!(dataset.models[0].title(), Some("Pyramid"));
        assert_eq!(
            dataset.published_at(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let dataset = Dataset::from_json("{}").unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.last_updated.is_none());
        assert!(dataset.published_at().is_none());

        let dataset = Dataset::from_json(r#"{"thoughts": null, "tags": null}"#).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_non_string_timestamp_is_malformed() {
        let dataset = Dataset::from_json(r#"{"lastUpdated": 1704067200000}"#).unwrap();
        assert_eq!(dataset.last_updated.as_deref(), Some("1704067200000"));
        assert!(dataset.published_at().is_none());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = Dataset::from_json("{not json").unwrap_err();
        assert!(matches!(err, SyncError::Parse(_)));
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"{"thoughts": [], "version": 3, "settings": {"theme": "dark"}}"#;
        let dataset = Dataset::from_json(json).unwrap();
        let again = Dataset::from_json(&dataset.to_json_pretty().unwrap()).unwrap();
        assert_eq!(again, dataset);
        assert_eq!(again.extra.get("version"), Some(&Value::from(3)));
    }

    #[test]
    fn test_stamp_uses_millisecond_iso_format() {
        let mut dataset = Dataset::default();
        dataset.stamp(Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 0).unwrap());
        assert_eq!(dataset.last_updated.as_deref(), Some("2024-03-05T12:30:00.000Z"));
        assert!(dataset.published_at().is_some());
    }

    #[test]
    fn test_stats() {
        let json = r#"{"thoughts": [{}, {}], "models": [{}], "tags": {"a": 1, "b": 2, "c": 3}}"#;
        let stats = Dataset::from_json(json).unwrap().stats();
        assert_eq!(stats, DatasetStats { thoughts: 2, models: 1, tags: 3 });
    }
}
