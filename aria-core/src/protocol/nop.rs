//! NOP radar hit messages
//!
//! Radar hits (`[RH]`) from the four NOP source systems share the same
//! leading layout:
//!
//! | Token | Content                                   |
//! |-------|-------------------------------------------|
//! | 0     | `[RH]`                                    |
//! | 1     | Source system (STARS, Center, AGW, MEARTS)|
//! | 2     | Facility, maybe with a `_B` backup suffix |
//! | 3     | Date `MM/dd/yyyy` or `MM-dd-yyyy`         |
//! | 4     | Time `HH:mm:ss.SSS` (UTC)                 |
//! | 5     | Callsign                                  |
//! | 6     | Aircraft type                             |
//! | 9     | Altitude in hundreds of feet              |
//! | 10    | Speed                                     |
//! | 11    | Heading                                   |
//! | 12    | Latitude                                  |
//! | 13    | Longitude                                 |
//! | 14    | Track number                              |

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};

use super::delimited::DelimitedText;
use super::RecordError;

/// Every radar hit line starts with this
pub const RADAR_HIT_PREFIX: &str = "[RH],";

const SYSTEM_INDEX: usize = 1;
const FACILITY_INDEX: usize = 2;
const DATE_INDEX: usize = 3;
const TIME_INDEX: usize = 4;
const CALLSIGN_INDEX: usize = 5;
const AIRCRAFT_TYPE_INDEX: usize = 6;
const ALTITUDE_INDEX: usize = 9;
const SPEED_INDEX: usize = 10;
const HEADING_INDEX: usize = 11;
const LATITUDE_INDEX: usize = 12;
const LONGITUDE_INDEX: usize = 13;
const TRACK_INDEX: usize = 14;

/// A radar hit parsed from one NOP line
#[derive(Debug, Clone)]
pub struct NopRadarHit {
    text: DelimitedText,
    time: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
}

impl NopRadarHit {
    pub fn parse(raw: impl Into<String>) -> Result<Self, RecordError> {
        let raw = raw.into();
        if !raw.starts_with(RADAR_HIT_PREFIX) {
            return Err(RecordError::malformed("not a NOP radar hit"));
        }

        let text = DelimitedText::new(raw);
        if text.token_count() <= TRACK_INDEX {
            return Err(RecordError::malformed(format!(
                "radar hit has only {} fields",
                text.token_count()
            )));
        }

        let time = parse_nop_time(text.token(DATE_INDEX)?, text.token(TIME_INDEX)?)?;
        let latitude = parse_number(text.token(LATITUDE_INDEX)?, "latitude")?;
        let longitude = parse_number(text.token(LONGITUDE_INDEX)?, "longitude")?;

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(RecordError::malformed(format!(
                "position ({}, {}) out of range",
                latitude, longitude
            )));
        }

        Ok(NopRadarHit {
            text,
            time,
            latitude,
            longitude,
        })
    }

    fn field(&self, index: usize) -> Option<&str> {
        self.text.token(index).ok().filter(|t| !t.is_empty())
    }

    /// Source system, e.g. "STARS"
    pub fn system(&self) -> &str {
        self.field(SYSTEM_INDEX).unwrap_or_default()
    }

    /// Three letter facility code, without any backup suffix
    pub fn facility(&self) -> &str {
        let token = self.field(FACILITY_INDEX).unwrap_or_default();
        token.get(..3).unwrap_or(token)
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn callsign(&self) -> Option<&str> {
        self.field(CALLSIGN_INDEX)
    }

    pub fn aircraft_type(&self) -> Option<&str> {
        self.field(AIRCRAFT_TYPE_INDEX)
    }

    pub fn altitude_hundreds_ft(&self) -> Option<i32> {
        self.field(ALTITUDE_INDEX).and_then(|t| t.parse().ok())
    }

    pub fn speed(&self) -> Option<f64> {
        self.field(SPEED_INDEX).and_then(|t| t.parse().ok())
    }

    pub fn heading(&self) -> Option<f64> {
        self.field(HEADING_INDEX).and_then(|t| t.parse().ok())
    }

    pub fn track_number(&self) -> Option<&str> {
        self.field(TRACK_INDEX)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn raw_text(&self) -> &str {
        self.text.as_str()
    }

    /// Rewrite this hit as a line of OpenARIA CSV
    ///
    /// Output: `,,{time},{facility}-{track},{lat},{long},{alt_ft},{base64 raw nop}`
    pub fn to_aria_csv(&self) -> String {
        let altitude = self
            .altitude_hundreds_ft()
            .map(|h| format!("{:.0}", f64::from(h) * 100.0))
            .unwrap_or_default();

        format!(
            ",,{},{}-{},{:.4},{:.4},{},{}",
            self.time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.facility(),
            self.track_number().unwrap_or_default(),
            self.latitude,
            self.longitude,
            altitude,
            URL_SAFE_NO_PAD.encode(self.raw_text().as_bytes()),
        )
    }
}

/// Convert one NOP radar hit line to OpenARIA CSV
pub fn nop_to_aria_csv(line: &str) -> Result<String, RecordError> {
    NopRadarHit::parse(line).map(|hit| hit.to_aria_csv())
}

fn parse_number(token: &str, name: &str) -> Result<f64, RecordError> {
    token
        .parse::<f64>()
        .map_err(|_| RecordError::malformed(format!("bad {} '{}'", name, token)))
}

fn parse_nop_time(date: &str, time: &str) -> Result<DateTime<Utc>, RecordError> {
    let date = NaiveDate::parse_from_str(&date.replace('-', "/"), "%m/%d/%Y")
        .map_err(|e| RecordError::malformed(format!("bad date '{}': {}", date, e)))?;

    let time_of_day = match NaiveTime::parse_from_str(time, "%H:%M:%S%.f") {
        Ok(t) => t,
        // some feeds write "00:57:121.00" when they mean "00:57:12.999"
        Err(_) if time.ends_with("1.00") => {
            let corrected = format!("{}.999", &time[..time.len() - "1.00".len()]);
            NaiveTime::parse_from_str(&corrected, "%H:%M:%S%.f")
                .map_err(|e| RecordError::malformed(format!("bad time '{}': {}", time, e)))?
        }
        Err(e) => return Err(RecordError::malformed(format!("bad time '{}': {}", time, e))),
    };

    Ok(date.and_time(time_of_day).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PositionReport;
    use chrono::TimeZone;

    const STARS: &str = "[RH],STARS,A80_B,07/10/2016,20:03:53.856,DAL200,MD88,D,1311,159,339,221,034.27719,-083.63591,1519,1311,57.2078,66.6181,1,L,A,A80,,DRE,ATL,2006,ATL,ACT,IFR,,01465,,,,,27L,L,1,,0,{RH}";
    const CENTER: &str = "[RH],Center,ZLA_B,07-10-2016,06:16:23.000,AAL350,B738,L,7305,176,381,319,34.0453,-119.1269,350,,,,,ZLA/15,,ZLA_B,,,,E0613,SFO,,IFR,,350,1396392188,LAX,0704,176//280,,L,1,,,{RH}";

    #[test]
    fn test_parse_stars_hit() {
        let hit = NopRadarHit::parse(STARS).unwrap();

        assert_eq!(hit.system(), "STARS");
        assert_eq!(hit.facility(), "A80");
        assert_eq!(
            hit.time(),
            Utc.with_ymd_and_hms(2016, 7, 10, 20, 3, 53).unwrap()
                + chrono::Duration::milliseconds(856)
        );
        assert_eq!(hit.callsign(), Some("DAL200"));
        assert_eq!(hit.aircraft_type(), Some("MD88"));
        assert_eq!(hit.altitude_hundreds_ft(), Some(159));
        assert_eq!(hit.speed(), Some(339.0));
        assert_eq!(hit.heading(), Some(221.0));
        assert_eq!(hit.latitude(), 34.27719);
        assert_eq!(hit.longitude(), -83.63591);
        assert_eq!(hit.track_number(), Some("1519"));
    }

    #[test]
    fn test_dash_separated_dates() {
        let hit = NopRadarHit::parse(CENTER).unwrap();
        assert_eq!(hit.facility(), "ZLA");
        assert_eq!(
            hit.time(),
            Utc.with_ymd_and_hms(2016, 7, 10, 6, 16, 23).unwrap()
        );
    }

    #[test]
    fn test_converted_hit_is_a_valid_position_report() {
        let csv = nop_to_aria_csv(STARS).unwrap();
        let report = PositionReport::parse(csv).unwrap();

        assert_eq!(report.token(2).unwrap(), "2016-07-10T20:03:53.856Z");
        assert_eq!(report.link_id(), "A80-1519");
        assert_eq!(report.token(4).unwrap(), "34.2772");
        assert_eq!(report.token(5).unwrap(), "-83.6359");
        assert_eq!(report.altitude_ft(), Some(15900.0));

        let raw = URL_SAFE_NO_PAD.decode(report.token(7).unwrap()).unwrap();
        assert_eq!(String::from_utf8(raw).unwrap(), STARS);
    }

    #[test]
    fn test_corrects_broken_milliseconds() {
        let time = parse_nop_time("10/18/2016", "00:57:121.00").unwrap();
        assert_eq!(
            time,
            Utc.with_ymd_and_hms(2016, 10, 18, 0, 57, 12).unwrap()
                + chrono::Duration::milliseconds(999)
        );
    }

    #[test]
    fn test_rejects_other_messages() {
        assert!(NopRadarHit::parse("[HB],STARS,A80,07/10/2016,20:03:53.856,{HB}").is_err());
        assert!(NopRadarHit::parse("[RH],STARS,A80_B,07/10/2016").is_err());
        assert!(NopRadarHit::parse(STARS.replace("034.27719", "95.0")).is_err());
    }
}
