use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::conflict::ConflictAngle;
use crate::hashing::{hash_value, HASH_FIELD_NAME};

pub const FACILITY_FIELD: &str = "facility";
pub const TIME_FIELD: &str = "eventEpochMsTime";
pub const SCORE_FIELD: &str = "eventScore";
pub const CONFLICT_ANGLE_FIELD: &str = "conflictAngle";

/// Code of the surveillance facility that saw an event, e.g. "A80"
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Facility(String);

impl Facility {
    pub fn new(code: impl Into<String>) -> Self {
        Facility(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Facility {
    fn from(code: &str) -> Self {
        Facility::new(code)
    }
}

impl From<String> for Facility {
    fn from(code: String) -> Self {
        Facility(code)
    }
}

/// Errors raised while building an [`AirborneEvent`]
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event JSON is not an object")]
    NotAnObject,

    #[error("event is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("event field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// A detected event: an ordered JSON object plus its parsed key fields
#[derive(Debug, Clone, PartialEq)]
pub struct AirborneEvent {
    fields: Map<String, Value>,
    facility: Facility,
    time: DateTime<Utc>,
    score: f64,
}

impl AirborneEvent {
    /// Start a record holding only the required fields
    pub fn new(
        facility: impl Into<Facility>,
        time: DateTime<Utc>,
        score: f64,
    ) -> Result<Self, EventError> {
        let facility = facility.into();
        let mut fields = Map::new();
        fields.insert(FACILITY_FIELD.into(), Value::from(facility.as_str()));
        fields.insert(TIME_FIELD.into(), Value::from(time.timestamp_millis()));
        fields.insert(SCORE_FIELD.into(), Value::from(score));

        Self::from_map(fields)
    }

    /// Append (or replace) one field, re-checking the required ones
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Result<Self, EventError> {
        self.fields.insert(key.to_string(), value.into());
        Self::from_map(self.fields)
    }

    pub fn from_json(json: &str) -> Result<Self, EventError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(fields) => Self::from_map(fields),
            _ => Err(EventError::NotAnObject),
        }
    }

    pub fn from_map(fields: Map<String, Value>) -> Result<Self, EventError> {
        let facility = match fields.get(FACILITY_FIELD) {
            Some(Value::String(code)) => Facility::new(code.as_str()),
            Some(_) => return Err(invalid(FACILITY_FIELD, "expected a string")),
            None => return Err(EventError::MissingField(FACILITY_FIELD)),
        };

        let millis = fields
            .get(TIME_FIELD)
            .ok_or(EventError::MissingField(TIME_FIELD))?
            .as_i64()
            .ok_or_else(|| invalid(TIME_FIELD, "expected integer epoch milliseconds"))?;
        let time = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| invalid(TIME_FIELD, "timestamp out of range"))?;

        let score = fields
            .get(SCORE_FIELD)
            .ok_or(EventError::MissingField(SCORE_FIELD))?
            .as_f64()
            .ok_or_else(|| invalid(SCORE_FIELD, "expected a number"))?;

        Ok(AirborneEvent {
            fields,
            facility,
            time,
            score,
        })
    }

    pub fn facility(&self) -> &Facility {
        &self.facility
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// UTC calendar date of the event
    pub fn date(&self) -> NaiveDate {
        self.time.date_naive()
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// The labelled conflict angle, when present and recognizable
    pub fn conflict_angle(&self) -> Option<ConflictAngle> {
        self.fields
            .get(CONFLICT_ANGLE_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    pub fn unique_id(&self) -> Option<&str> {
        self.fields.get(HASH_FIELD_NAME).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Hash of this record's content, ignoring any existing `uniqueId`
    pub fn content_hash(&self) -> String {
        if self.fields.contains_key(HASH_FIELD_NAME) {
            let mut content = self.fields.clone();
            content.shift_remove(HASH_FIELD_NAME);
            hash_value(&Value::Object(content))
        } else {
            hash_value(&Value::Object(self.fields.clone()))
        }
    }

    /// Stamp the record with its content hash as the first field
    ///
    /// Calling this again yields the same id.
    pub fn with_unique_id(mut self) -> Self {
        let hash = self.content_hash();
        self.fields.shift_remove(HASH_FIELD_NAME);

        let mut fields = Map::with_capacity(self.fields.len() + 1);
        fields.insert(HASH_FIELD_NAME.into(), Value::String(hash));
        fields.extend(self.fields);
        self.fields = fields;
        self
    }

    /// Compact single line JSON, keys in their original order
    pub fn as_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

fn invalid(field: &'static str, reason: &str) -> EventError {
    EventError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

impl Serialize for AirborneEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AirborneEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::deserialize(deserializer)?;
        AirborneEvent::from_map(fields).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::hash_json;

    const EVENT: &str = r#"{
  "facility": "A80",
  "eventEpochMsTime": 1468181033856,
  "eventScore": 12.5,
  "conflictAngle": "CROSSING",
  "callsigns": ["DAL200", "N123"]
}"#;

    #[test]
    fn test_parse_required_fields() {
        let event = AirborneEvent::from_json(EVENT).unwrap();

        assert_eq!(event.facility().as_str(), "A80");
        assert_eq!(event.time().timestamp_millis(), 1468181033856);
        assert_eq!(event.date(), NaiveDate::from_ymd_opt(2016, 7, 10).unwrap());
        assert_eq!(event.score(), 12.5);
        assert_eq!(event.conflict_angle(), Some(ConflictAngle::Crossing));
        assert_eq!(event.unique_id(), None);
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let result = AirborneEvent::from_json(r#"{"facility": "A80", "eventScore": 1.0}"#);
        assert!(matches!(result, Err(EventError::MissingField(TIME_FIELD))));

        let result = AirborneEvent::from_json(r#"{"facility": 7, "eventEpochMsTime": 0, "eventScore": 1.0}"#);
        assert!(matches!(
            result,
            Err(EventError::InvalidField {
                field: FACILITY_FIELD,
                ..
            })
        ));

        assert!(matches!(
            AirborneEvent::from_json("[1]"),
            Err(EventError::NotAnObject)
        ));
    }

    #[test]
    fn test_unique_id_matches_text_hash() {
        let event = AirborneEvent::from_json(EVENT).unwrap().with_unique_id();

        assert_eq!(event.unique_id(), Some(hash_json(EVENT).unwrap().as_str()));
        assert_eq!(
            event.fields().keys().next().map(String::as_str),
            Some(HASH_FIELD_NAME)
        );
    }

    #[test]
    fn test_unique_id_is_stable() {
        let once = AirborneEvent::from_json(EVENT).unwrap().with_unique_id();
        let twice = once.clone().with_unique_id();
        assert_eq!(once, twice);
        assert_eq!(once.content_hash(), once.unique_id().unwrap());
    }

    #[test]
    fn test_builder_keeps_insertion_order() {
        let time = Utc.timestamp_millis_opt(0).unwrap();
        let event = AirborneEvent::new("ZLA", time, 3.0)
            .unwrap()
            .with_field(CONFLICT_ANGLE_FIELD, "OPPOSITE")
            .unwrap();

        assert_eq!(
            event.as_json(),
            r#"{"facility":"ZLA","eventEpochMsTime":0,"eventScore":3.0,"conflictAngle":"OPPOSITE"}"#
        );
        assert_eq!(event.conflict_angle(), Some(ConflictAngle::Opposite));

        // replacing a required field is re-validated
        let event = event.with_field(FACILITY_FIELD, "SCT").unwrap();
        assert_eq!(event.facility().as_str(), "SCT");
        assert!(event.with_field(SCORE_FIELD, "high").is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let event = AirborneEvent::from_json(EVENT).unwrap();
        let json = serde_json::to_string(&event).unwrap();
        let back: AirborneEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
