use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Headings must fall in this range (degrees)
pub const VALID_COURSE_RANGE: RangeInclusive<f64> = 0.0..=360.0;

/// Signed heading differences must fall in this range (degrees)
pub const VALID_ANGLE_DIFFERENCE_RANGE: RangeInclusive<f64> = -180.0..=180.0;

/// Largest heading difference still labelled [`ConflictAngle::Same`]
pub const SAME_MAX_DEGREES: f64 = 45.0;

/// Largest heading difference still labelled [`ConflictAngle::Crossing`]
pub const CROSSING_MAX_DEGREES: f64 = 135.0;

/// Errors raised when classifying a conflict angle
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConflictAngleError {
    /// An input angle was outside its valid range (or NaN)
    #[error("angle {value} outside [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    /// Text did not name a conflict angle
    #[error("unknown conflict angle '{0}'")]
    Unknown(String),
}

/// How the courses of two aircraft relate to each other
///
/// | Heading difference | Label    |
/// |--------------------|----------|
/// | 0 to 45 inclusive  | SAME     |
/// | above 45 to 135    | CROSSING |
/// | above 135 to 180   | OPPOSITE |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConflictAngle {
    Same,
    Crossing,
    Opposite,
}

impl ConflictAngle {
    /// Classify two headings, each in [0, 360] degrees
    pub fn between(course_a: f64, course_b: f64) -> Result<ConflictAngle, ConflictAngleError> {
        check_range(course_a, &VALID_COURSE_RANGE)?;
        check_range(course_b, &VALID_COURSE_RANGE)?;

        Ok(Self::classify(angle_difference(course_a, course_b)))
    }

    /// Classify a signed heading difference in [-180, 180] degrees
    pub fn from_angle_difference(difference: f64) -> Result<ConflictAngle, ConflictAngleError> {
        check_range(difference, &VALID_ANGLE_DIFFERENCE_RANGE)?;

        Ok(Self::classify(difference.abs()))
    }

    fn classify(abs_difference: f64) -> ConflictAngle {
        if abs_difference <= SAME_MAX_DEGREES {
            ConflictAngle::Same
        } else if abs_difference <= CROSSING_MAX_DEGREES {
            ConflictAngle::Crossing
        } else {
            ConflictAngle::Opposite
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConflictAngle::Same => "SAME",
            ConflictAngle::Crossing => "CROSSING",
            ConflictAngle::Opposite => "OPPOSITE",
        }
    }
}

/// Unsigned difference between two headings, folded into [0, 180]
pub fn angle_difference(course_a: f64, course_b: f64) -> f64 {
    let raw = (course_a - course_b).abs();
    raw.min(360.0 - raw)
}

fn check_range(value: f64, range: &RangeInclusive<f64>) -> Result<(), ConflictAngleError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConflictAngleError::OutOfRange {
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

impl fmt::Display for ConflictAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case and surrounding whitespace are ignored: " crossing " parses
impl FromStr for ConflictAngle {
    type Err = ConflictAngleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SAME" => Ok(ConflictAngle::Same),
            "CROSSING" => Ok(ConflictAngle::Crossing),
            "OPPOSITE" => Ok(ConflictAngle::Opposite),
            _ => Err(ConflictAngleError::Unknown(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ConflictAngle::*;

    #[test]
    fn test_rejects_bad_courses() {
        assert!(ConflictAngle::between(-0.001, 10.0).is_err());
        assert!(ConflictAngle::between(360.001, 10.0).is_err());
        assert!(ConflictAngle::between(10.0, f64::NAN).is_err());
        assert!(ConflictAngle::from_angle_difference(180.5).is_err());
    }

    #[test]
    fn test_same_direction() {
        assert_eq!(ConflictAngle::between(10.0, 10.0).unwrap(), Same);
        assert_eq!(ConflictAngle::between(360.0, 360.0).unwrap(), Same);
        assert_eq!(ConflictAngle::between(0.0, 44.9).unwrap(), Same);
        assert_eq!(ConflictAngle::between(0.0, 45.0).unwrap(), Same);
        assert_eq!(ConflictAngle::between(350.0, 10.0).unwrap(), Same);
        assert_eq!(ConflictAngle::between(10.0, 350.0).unwrap(), Same);
    }

    #[test]
    fn test_crossing_angles() {
        assert_eq!(ConflictAngle::between(0.0, 45.01).unwrap(), Crossing);
        assert_eq!(ConflictAngle::between(45.01, 0.0).unwrap(), Crossing);
        assert_eq!(ConflictAngle::between(0.0, 135.0).unwrap(), Crossing);
        assert_eq!(ConflictAngle::between(135.0, 0.0).unwrap(), Crossing);
        assert_eq!(ConflictAngle::between(10.0, 145.0).unwrap(), Crossing);
    }

    #[test]
    fn test_opposite_direction() {
        assert_eq!(ConflictAngle::between(0.0, 135.01).unwrap(), Opposite);
        assert_eq!(ConflictAngle::between(135.01, 0.0).unwrap(), Opposite);
        assert_eq!(ConflictAngle::between(0.0, 224.99).unwrap(), Opposite);
        assert_eq!(ConflictAngle::between(0.0, 180.0).unwrap(), Opposite);
    }

    #[test]
    fn test_signed_difference() {
        assert_eq!(ConflictAngle::from_angle_difference(-45.0).unwrap(), Same);
        assert_eq!(ConflictAngle::from_angle_difference(-90.0).unwrap(), Crossing);
        assert_eq!(ConflictAngle::from_angle_difference(-180.0).unwrap(), Opposite);
    }

    #[test]
    fn test_text_round_trip() {
        assert_eq!(" crossing ".parse::<ConflictAngle>().unwrap(), Crossing);
        assert_eq!("OPPOSITE".parse::<ConflictAngle>().unwrap(), Opposite);
        assert!("sideways".parse::<ConflictAngle>().is_err());

        assert_eq!(serde_json::to_string(&Same).unwrap(), "\"SAME\"");
        assert_eq!(
            serde_json::from_str::<ConflictAngle>("\"CROSSING\"").unwrap(),
            Crossing
        );
    }

    proptest! {
        #[test]
        fn prop_identical_courses_are_same(h in 0.0f64..=360.0) {
            prop_assert_eq!(ConflictAngle::between(h, h).unwrap(), Same);
        }

        #[test]
        fn prop_classification_is_symmetric(a in 0.0f64..=360.0, b in 0.0f64..=360.0) {
            prop_assert_eq!(
                ConflictAngle::between(a, b).unwrap(),
                ConflictAngle::between(b, a).unwrap()
            );
        }

        #[test]
        fn prop_difference_is_folded(a in 0.0f64..=360.0, b in 0.0f64..=360.0) {
            let d = angle_difference(a, b);
            prop_assert!((0.0..=180.0).contains(&d));
        }
    }
}
