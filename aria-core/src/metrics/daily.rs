use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{AirborneEvent, Facility};
use crate::hashing::collapse_vertical_arrays;

/// Histogram bins covering the expected score range, [0, 100]
pub const NUM_BINS: usize = 20;

/// Width of each histogram bin in score units
pub const BIN_WIDTH: f64 = 5.0;

const DATE_FORMAT: &str = "%Y-%m-%d";

const REQUIRED_KEYS: [&str; 5] = ["date", "facility", "eventCount", "avgEventScore", "histogram"];

#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    /// Strict extension was given an event for another day or facility
    #[error("cannot extend metric for {dimension} {expected} with an event for {found}")]
    Mismatch {
        dimension: &'static str,
        expected: String,
        found: String,
    },

    #[error("invalid daily metric: {0}")]
    Validation(String),

    #[error("event score {0} is not a finite, non-negative number")]
    InvalidScore(f64),

    #[error("daily metric JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One value, or a marker that several different values were merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope<T> {
    Single(T),
    Mixed,
}

impl<T: PartialEq> Scope<T> {
    /// Keep the value when both sides agree, otherwise become [`Scope::Mixed`]
    pub fn merge(self, other: Scope<T>) -> Scope<T> {
        match (self, other) {
            (Scope::Single(a), Scope::Single(b)) if a == b => Scope::Single(a),
            _ => Scope::Mixed,
        }
    }
}

impl<T> Scope<T> {
    pub fn single(&self) -> Option<&T> {
        match self {
            Scope::Single(value) => Some(value),
            Scope::Mixed => None,
        }
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, Scope::Mixed)
    }
}

impl<T: fmt::Display> fmt::Display for Scope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Single(value) => value.fmt(f),
            Scope::Mixed => f.write_str("(mixed)"),
        }
    }
}

/// Count, mean score and score histogram of the events of one day at one
/// facility
///
/// Instances are never modified; [`extend`](Self::extend) and
/// [`combine`](Self::combine) return new values, so partial results from
/// independent workers can be merged in any grouping.
///
/// The canonical JSON form always lists `date`, `facility`, `eventCount`,
/// `avgEventScore` and `histogram` in that order, with the histogram on one
/// line. A mixed date or facility is written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "CanonicalForm", try_from = "CanonicalForm")]
pub struct DailyMetric {
    date: Scope<NaiveDate>,
    facility: Scope<Facility>,
    event_count: u64,
    avg_event_score: f64,
    histogram: [u64; NUM_BINS],
}

impl DailyMetric {
    /// A metric summarizing exactly one event
    pub fn from_event(event: &AirborneEvent) -> Result<Self, MetricError> {
        Self::single(event.date(), event.facility().clone(), event.score())
    }

    pub fn single(date: NaiveDate, facility: Facility, score: f64) -> Result<Self, MetricError> {
        let mut histogram = [0; NUM_BINS];
        histogram[bin_index(score)?] = 1;

        Ok(DailyMetric {
            date: Scope::Single(date),
            facility: Scope::Single(facility),
            event_count: 1,
            avg_event_score: score,
            histogram,
        })
    }

    /// Add one more event from the same day and facility
    ///
    /// Fails with [`MetricError::Mismatch`] when the event belongs elsewhere,
    /// including when this metric is already mixed.
    pub fn extend(&self, event: &AirborneEvent) -> Result<Self, MetricError> {
        let date = event.date();
        if self.date != Scope::Single(date) {
            return Err(MetricError::Mismatch {
                dimension: "date",
                expected: self.date.to_string(),
                found: date.to_string(),
            });
        }
        if self.facility.single() != Some(event.facility()) {
            return Err(MetricError::Mismatch {
                dimension: "facility",
                expected: self.facility.to_string(),
                found: event.facility().to_string(),
            });
        }

        let score = event.score();
        let mut histogram = self.histogram;
        let bin = &mut histogram[bin_index(score)?];
        *bin = bin.saturating_add(1);

        Ok(DailyMetric {
            date: self.date,
            facility: self.facility.clone(),
            event_count: self.event_count.saturating_add(1),
            avg_event_score: merged_mean(self.avg_event_score, self.event_count, score, 1),
            histogram,
        })
    }

    /// Merge two metrics; dimensions that disagree become mixed
    ///
    /// Counts saturate at `u64::MAX` instead of wrapping.
    pub fn combine(&self, other: &DailyMetric) -> DailyMetric {
        let mut histogram = self.histogram;
        for (bin, count) in histogram.iter_mut().zip(other.histogram) {
            *bin = bin.saturating_add(count);
        }

        DailyMetric {
            date: self.date.merge(other.date),
            facility: self.facility.clone().merge(other.facility.clone()),
            event_count: self.event_count.saturating_add(other.event_count),
            avg_event_score: merged_mean(
                self.avg_event_score,
                self.event_count,
                other.avg_event_score,
                other.event_count,
            ),
            histogram,
        }
    }

    pub fn date(&self) -> &Scope<NaiveDate> {
        &self.date
    }

    pub fn facility(&self) -> &Scope<Facility> {
        &self.facility
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn avg_event_score(&self) -> f64 {
        self.avg_event_score
    }

    pub fn histogram(&self) -> &[u64; NUM_BINS] {
        &self.histogram
    }

    pub fn as_canonical_json(&self) -> Result<String, MetricError> {
        let pretty = serde_json::to_string_pretty(self)?;
        Ok(collapse_vertical_arrays(&pretty))
    }

    /// Parse and validate the canonical JSON form
    ///
    /// Every key must be present; `null` is only accepted for `date` and
    /// `facility`.
    pub fn parse_canonical_json(json: &str) -> Result<Self, MetricError> {
        let value: Value = serde_json::from_str(json)?;
        let object = value
            .as_object()
            .ok_or_else(|| MetricError::Validation("expected a JSON object".into()))?;

        if let Some(missing) = REQUIRED_KEYS.iter().find(|k| !object.contains_key(**k)) {
            return Err(MetricError::Validation(format!(
                "missing field '{}'",
                missing
            )));
        }

        let form: CanonicalForm = serde_json::from_value(value)
            .map_err(|e| MetricError::Validation(e.to_string()))?;
        DailyMetric::try_from(form)
    }
}

/// Count weighted mean of two means, without forming the (possibly
/// infinite) sum of all scores
fn merged_mean(mean_a: f64, count_a: u64, mean_b: f64, count_b: u64) -> f64 {
    let total = count_a as f64 + count_b as f64;
    mean_a + (mean_b - mean_a) / total * count_b as f64
}

fn bin_index(score: f64) -> Result<usize, MetricError> {
    if !score.is_finite() || score < 0.0 {
        return Err(MetricError::InvalidScore(score));
    }
    // scores over the intended range land in the last bin
    Ok(((score / BIN_WIDTH) as usize).min(NUM_BINS - 1))
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalForm {
    date: Option<String>,
    facility: Option<String>,
    event_count: u64,
    avg_event_score: f64,
    histogram: Vec<u64>,
}

impl From<DailyMetric> for CanonicalForm {
    fn from(metric: DailyMetric) -> Self {
        CanonicalForm {
            date: metric
                .date
                .single()
                .map(|d| d.format(DATE_FORMAT).to_string()),
            facility: metric.facility.single().map(|f| f.as_str().to_string()),
            event_count: metric.event_count,
            avg_event_score: metric.avg_event_score,
            histogram: metric.histogram.to_vec(),
        }
    }
}

impl TryFrom<CanonicalForm> for DailyMetric {
    type Error = MetricError;

    fn try_from(form: CanonicalForm) -> Result<Self, Self::Error> {
        let date = match form.date {
            Some(text) => Scope::Single(
                NaiveDate::parse_from_str(&text, DATE_FORMAT)
                    .map_err(|e| MetricError::Validation(format!("date '{}': {}", text, e)))?,
            ),
            None => Scope::Mixed,
        };
        let facility = match form.facility {
            Some(code) => Scope::Single(Facility::new(code)),
            None => Scope::Mixed,
        };

        if form.event_count < 1 {
            return Err(MetricError::Validation("eventCount must be at least 1".into()));
        }
        if !form.avg_event_score.is_finite() || form.avg_event_score < 0.0 {
            return Err(MetricError::Validation(format!(
                "avgEventScore {} must be non-negative",
                form.avg_event_score
            )));
        }

        let histogram: [u64; NUM_BINS] = form.histogram.try_into().map_err(|h: Vec<u64>| {
            MetricError::Validation(format!(
                "histogram has {} entries, expected {}",
                h.len(),
                NUM_BINS
            ))
        })?;
        let total = histogram
            .iter()
            .try_fold(0u64, |sum, &count| sum.checked_add(count))
            .ok_or_else(|| MetricError::Validation("histogram total overflows".into()))?;
        if total != form.event_count {
            return Err(MetricError::Validation(format!(
                "eventCount {} does not match histogram total {}",
                form.event_count, total
            )));
        }

        Ok(DailyMetric {
            date,
            facility,
            event_count: form.event_count,
            avg_event_score: form.avg_event_score,
            histogram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    // 1970-01-02
    const DAY_TWO_MS: i64 = 86_400_000;

    fn event(facility: &str, ms: i64, score: f64) -> AirborneEvent {
        AirborneEvent::new(facility, Utc.timestamp_millis_opt(ms).unwrap(), score).unwrap()
    }

    #[test]
    fn test_single_event_fills_one_bin() {
        let metric = DailyMetric::from_event(&event("A80", DAY_TWO_MS, 19.0)).unwrap();

        assert_eq!(metric.event_count(), 1);
        assert_eq!(metric.avg_event_score(), 19.0);
        assert_eq!(metric.histogram().iter().sum::<u64>(), 1);
        assert_eq!(metric.histogram()[3], 1);
        assert_eq!(
            metric.date(),
            &Scope::Single(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap())
        );
    }

    #[test]
    fn test_bin_edges() {
        assert_eq!(bin_index(0.0).unwrap(), 0);
        assert_eq!(bin_index(4.99).unwrap(), 0);
        assert_eq!(bin_index(5.0).unwrap(), 1);
        assert_eq!(bin_index(99.9).unwrap(), 19);
        assert_eq!(bin_index(250.0).unwrap(), 19);
        assert!(bin_index(-1.0).is_err());
        assert!(bin_index(f64::NAN).is_err());
    }

    #[test]
    fn test_extend_same_day_and_facility() {
        let metric = DailyMetric::from_event(&event("A80", DAY_TWO_MS, 10.0))
            .unwrap()
            .extend(&event("A80", DAY_TWO_MS + 1000, 20.0))
            .unwrap();

        assert_eq!(metric.event_count(), 2);
        assert_eq!(metric.avg_event_score(), 15.0);
        assert_eq!(metric.histogram()[2], 1);
        assert_eq!(metric.histogram()[4], 1);
    }

    #[test]
    fn test_extend_rejects_mismatch() {
        let metric = DailyMetric::from_event(&event("A80", DAY_TWO_MS, 10.0)).unwrap();

        let other_facility = metric.extend(&event("ZLA", DAY_TWO_MS, 10.0));
        assert!(matches!(
            other_facility,
            Err(MetricError::Mismatch {
                dimension: "facility",
                ..
            })
        ));

        let other_day = metric.extend(&event("A80", 0, 10.0));
        assert!(matches!(
            other_day,
            Err(MetricError::Mismatch {
                dimension: "date",
                ..
            })
        ));
    }

    #[test]
    fn test_combine_mixed_facilities() {
        let a = DailyMetric::from_event(&event("A80", DAY_TWO_MS, 10.0)).unwrap();
        let b = DailyMetric::from_event(&event("ZLA", DAY_TWO_MS, 40.0))
            .unwrap()
            .extend(&event("ZLA", DAY_TWO_MS, 40.0))
            .unwrap();

        let combined = a.combine(&b);
        assert!(combined.facility().is_mixed());
        assert!(!combined.date().is_mixed());
        assert_eq!(combined.event_count(), 3);
        assert_eq!(combined.avg_event_score(), 30.0);
        assert_eq!(combined.histogram()[8], 2);

        // mixed stays mixed and strict extension refuses it
        assert!(combined.combine(&a).facility().is_mixed());
        assert!(combined.extend(&event("A80", DAY_TWO_MS, 1.0)).is_err());
    }

    #[test]
    fn test_canonical_json_layout() {
        let metric = DailyMetric::from_event(&event("A80", DAY_TWO_MS, 22.0)).unwrap();

        let expected = "{\n  \"date\": \"1970-01-02\",\n  \"facility\": \"A80\",\n  \"eventCount\": 1,\n  \"avgEventScore\": 22.0,\n  \"histogram\": [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]\n}";
        assert_eq!(metric.as_canonical_json().unwrap(), expected);
        assert_eq!(DailyMetric::parse_canonical_json(expected).unwrap(), metric);
    }

    #[test]
    fn test_mixed_dimensions_are_null() {
        let a = DailyMetric::from_event(&event("A80", 0, 1.0)).unwrap();
        let b = DailyMetric::from_event(&event("ZLA", DAY_TWO_MS, 1.0)).unwrap();
        let json = a.combine(&b).as_canonical_json().unwrap();

        assert!(json.contains("\"date\": null"));
        assert!(json.contains("\"facility\": null"));
        assert_eq!(DailyMetric::parse_canonical_json(&json).unwrap(), a.combine(&b));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        let good = DailyMetric::from_event(&event("A80", 0, 1.0))
            .unwrap()
            .as_canonical_json()
            .unwrap();

        let missing_date = good.replace("\"date\": \"1970-01-01\",", "");
        assert!(matches!(
            DailyMetric::parse_canonical_json(&missing_date),
            Err(MetricError::Validation(_))
        ));

        let bad_count = good.replace("\"eventCount\": 1", "\"eventCount\": 2");
        assert!(matches!(
            DailyMetric::parse_canonical_json(&bad_count),
            Err(MetricError::Validation(_))
        ));

        let bad_date = good.replace("1970-01-01", "01/01/1970");
        assert!(DailyMetric::parse_canonical_json(&bad_date).is_err());

        let short = good.replace("[1, 0,", "[1,");
        assert!(DailyMetric::parse_canonical_json(&short).is_err());

        assert!(DailyMetric::parse_canonical_json("[]").is_err());
    }

    #[test]
    fn test_huge_histogram_is_rejected() {
        let mut bins = vec!["0"; NUM_BINS];
        bins[0] = "18446744073709551615";
        bins[1] = "2";
        let json = format!(
            "{{\"date\": \"1970-01-01\", \"facility\": \"A80\", \"eventCount\": 1, \"avgEventScore\": 1.0, \"histogram\": [{}]}}",
            bins.join(", ")
        );

        assert!(matches!(
            DailyMetric::parse_canonical_json(&json),
            Err(MetricError::Validation(_))
        ));
    }

    #[test]
    fn test_combine_saturates_counts() {
        let mut bins = vec!["0".to_string(); NUM_BINS];
        bins[0] = u64::MAX.to_string();
        let json = format!(
            "{{\"date\": \"1970-01-01\", \"facility\": \"A80\", \"eventCount\": {}, \"avgEventScore\": 1.0, \"histogram\": [{}]}}",
            u64::MAX,
            bins.join(", ")
        );
        let full = DailyMetric::parse_canonical_json(&json).unwrap();

        let combined = full.combine(&full);
        assert_eq!(combined.event_count(), u64::MAX);
        assert_eq!(combined.histogram()[0], u64::MAX);
        assert_eq!(combined.avg_event_score(), 1.0);

        let extended = full.extend(&event("A80", 0, 1.0)).unwrap();
        assert_eq!(extended.event_count(), u64::MAX);
    }

    #[test]
    fn test_huge_scores_keep_a_finite_mean() {
        let a = DailyMetric::from_event(&event("A80", 0, 1e308)).unwrap();
        let b = a.extend(&event("A80", 1, 1e308)).unwrap();
        assert_eq!(b.avg_event_score(), 1e308);

        let combined = b.combine(&a).combine(&b);
        assert_eq!(combined.avg_event_score(), 1e308);

        let json = combined.as_canonical_json().unwrap();
        assert_eq!(DailyMetric::parse_canonical_json(&json).unwrap(), combined);

        let mixed = DailyMetric::from_event(&event("A80", 0, f64::MAX))
            .unwrap()
            .combine(&DailyMetric::from_event(&event("A80", 0, 0.0)).unwrap());
        assert!(mixed.avg_event_score().is_finite());
    }

    proptest! {
        #[test]
        fn prop_canonical_json_round_trip(
            scores in proptest::collection::vec((0.0f64..150.0, 0usize..3, 0i64..3), 1..12)
        ) {
            let facilities = ["A80", "ZLA", "D10"];
            let metric = scores
                .iter()
                .map(|&(score, f, day)| {
                    DailyMetric::from_event(&event(facilities[f], day * DAY_TWO_MS, score)).unwrap()
                })
                .reduce(|a, b| a.combine(&b))
                .unwrap();

            let json = metric.as_canonical_json().unwrap();
            let parsed = DailyMetric::parse_canonical_json(&json).unwrap();
            prop_assert_eq!(&parsed, &metric);
            prop_assert_eq!(parsed.as_canonical_json().unwrap(), json);
        }
    }
}
