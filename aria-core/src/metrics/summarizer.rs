use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};

use super::daily::{DailyMetric, MetricError};
use crate::event::{AirborneEvent, Facility};

/// Daily metrics broken down by UTC date, then by facility
///
/// Each worker should own a summarizer for its shard of the event stream;
/// a coordinator folds them together afterwards with
/// [`ingest_all`](Self::ingest_all).
#[derive(Debug, Clone, Default)]
pub struct EventSummarizer {
    summaries: BTreeMap<NaiveDate, BTreeMap<Facility, DailyMetric>>,
    event_count: u64,
}

impl EventSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one event into the metric for its (date, facility)
    pub fn accept(&mut self, event: &AirborneEvent) -> Result<(), MetricError> {
        let date = event.date();
        let prior = self
            .summaries
            .get(&date)
            .and_then(|by_facility| by_facility.get(event.facility()));

        let metric = match prior {
            Some(prior) => prior.extend(event)?,
            None => DailyMetric::from_event(event)?,
        };
        self.summaries
            .entry(date)
            .or_default()
            .insert(event.facility().clone(), metric);

        self.event_count += 1;
        Ok(())
    }

    /// Fold every metric of `other` into this summarizer
    pub fn ingest_all(&mut self, other: &EventSummarizer) {
        for (date, by_facility) in &other.summaries {
            let ours = self.summaries.entry(*date).or_default();

            for (facility, metric) in by_facility {
                let merged = match ours.get(facility) {
                    Some(prior) => prior.combine(metric),
                    None => metric.clone(),
                };
                ours.insert(facility.clone(), merged);
            }
        }
        self.event_count += other.event_count;
    }

    pub fn summaries_for(&self, date: NaiveDate) -> Option<&BTreeMap<Facility, DailyMetric>> {
        self.summaries.get(&date)
    }

    /// Metrics for the UTC day containing `time`
    pub fn summaries_for_time(&self, time: DateTime<Utc>) -> Option<&BTreeMap<Facility, DailyMetric>> {
        self.summaries_for(time.date_naive())
    }

    pub fn summaries_for_facility(&self, facility: &Facility) -> BTreeMap<NaiveDate, &DailyMetric> {
        self.summaries
            .iter()
            .filter_map(|(date, by_facility)| by_facility.get(facility).map(|m| (*date, m)))
            .collect()
    }

    /// Every metric, ordered by date then facility
    pub fn all_summaries(&self) -> impl Iterator<Item = &DailyMetric> {
        self.summaries.values().flat_map(BTreeMap::values)
    }

    pub fn date_keys(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.summaries.keys().copied()
    }

    pub fn facility_keys(&self) -> BTreeSet<&Facility> {
        self.summaries.values().flat_map(BTreeMap::keys).collect()
    }

    /// Events accepted directly or through [`ingest_all`](Self::ingest_all)
    pub fn event_count(&self) -> u64 {
        self.event_count
    }
}
