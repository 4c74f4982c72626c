//! OpenARIA CSV position reports
//!
//! The default, human-writeable format for aircraft position data. One line
//! describes one position measurement of one vehicle:
//!
//! ```text
//! ,,2018-03-24T14:41:09.371Z,vehicle1,40.7,-74.0,3400,anything,else
//! ^ ^ ^                      ^        ^    ^     ^    ^
//! | | time (ISO-8601, UTC)   link id  lat  long  alt  extra fields
//! | partition b
//! partition a
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::delimited::DelimitedText;
use super::RecordError;

/// A line needs at least this many fields (five commas)
pub const MIN_FIELD_COUNT: usize = 6;

const TIME_INDEX: usize = 2;
const LINK_ID_INDEX: usize = 3;
const LATITUDE_INDEX: usize = 4;
const LONGITUDE_INDEX: usize = 5;
const ALTITUDE_INDEX: usize = 6;

/// One position measurement parsed from a line of OpenARIA CSV
///
/// Time, link id, latitude and longitude are parsed once at construction and
/// cached because reports are constantly sorted and joined on them. Every
/// other field is sliced from the backing text on request.
#[derive(Debug, Clone)]
pub struct PositionReport {
    text: DelimitedText,
    time: DateTime<Utc>,
    link_id: String,
    latitude: f64,
    longitude: f64,
}

impl PositionReport {
    /// Parse one line of OpenARIA CSV
    ///
    /// Fails when the line has fewer than [`MIN_FIELD_COUNT`] fields, the time
    /// is not ISO-8601, or latitude/longitude are unparseable or outside
    /// ±90/±180. Out of range coordinates are rejected, never clamped.
    pub fn parse(raw: impl Into<String>) -> Result<Self, RecordError> {
        let text = DelimitedText::new(raw);

        if text.token_count() < MIN_FIELD_COUNT {
            return Err(RecordError::malformed(format!(
                "expected at least {} fields, found {}",
                MIN_FIELD_COUNT,
                text.token_count()
            )));
        }

        let time_token = text.token(TIME_INDEX)?;
        let time = time_token
            .parse::<DateTime<Utc>>()
            .map_err(|e| RecordError::malformed(format!("bad time '{}': {}", time_token, e)))?;

        let link_id = text.token(LINK_ID_INDEX)?.to_string();
        let latitude = parse_coordinate(text.token(LATITUDE_INDEX)?, "latitude", 90.0)?;
        let longitude = parse_coordinate(text.token(LONGITUDE_INDEX)?, "longitude", 180.0)?;

        Ok(PositionReport {
            text,
            time,
            link_id,
            latitude,
            longitude,
        })
    }

    /// The i-th comma separated field of the original line
    pub fn token(&self, index: usize) -> Result<&str, RecordError> {
        self.text.token(index)
    }

    /// Number of fields in the original line, including an empty trailing one
    pub fn field_count(&self) -> usize {
        self.text.token_count()
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Identifies one vehicle across many reports (links reports into tracks)
    pub fn link_id(&self) -> &str {
        &self.link_id
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Altitude in feet, if the 7th field is present and numeric
    pub fn altitude_ft(&self) -> Option<f64> {
        self.text
            .token(ALTITUDE_INDEX)
            .ok()
            .and_then(|t| t.trim().parse::<f64>().ok())
    }

    pub fn raw_text(&self) -> &str {
        self.text.as_str()
    }
}

fn parse_coordinate(token: &str, name: &str, limit: f64) -> Result<f64, RecordError> {
    let value = token
        .trim()
        .parse::<f64>()
        .map_err(|_| RecordError::malformed(format!("bad {} '{}'", name, token)))?;

    if !(-limit..=limit).contains(&value) {
        return Err(RecordError::malformed(format!(
            "{} {} outside [-{}, {}]",
            name, value, limit, limit
        )));
    }
    Ok(value)
}

impl FromStr for PositionReport {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PositionReport::parse(s)
    }
}

impl fmt::Display for PositionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw_text())
    }
}

// Everything else is derived from the raw text, so it alone decides equality
impl PartialEq for PositionReport {
    fn eq(&self, other: &Self) -> bool {
        self.raw_text() == other.raw_text()
    }
}

impl Eq for PositionReport {}

/// Ordered by time, then by raw text
impl Ord for PositionReport {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.raw_text().cmp(other.raw_text()))
    }
}

impl PartialOrd for PositionReport {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
