use std::collections::BTreeMap;
use std::iter;

use chrono::{DateTime, Duration, Utc};

/// 24 hours worth of one minute buckets
pub const DEFAULT_MAX_BUCKETS: usize = 24 * 60;

pub const DEFAULT_BUCKET_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DensityError {
    /// Asked for the extent of a histogram with no buckets
    #[error("no time buckets have been recorded")]
    Empty,

    #[error("invalid histogram configuration: {0}")]
    InvalidConfig(String),
}

/// Closed interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Instants from `start` to `end` inclusive, `step` apart
    pub fn steps(self, step: Duration) -> impl Iterator<Item = DateTime<Utc>> {
        iter::successors(Some(self.start), move |t| t.checked_add_signed(step))
            .take_while(move |t| *t <= self.end)
    }
}

/// Bounded count of arrivals per fixed width time bucket
///
/// Bucket starts are instants truncated down to a multiple of the bucket
/// width since the Unix epoch. When more than `max_buckets` buckets exist,
/// the ones with the earliest start are dropped, no matter how recently they
/// were incremented.
///
/// Not synchronized; give each worker its own histogram.
#[derive(Debug, Clone)]
pub struct RollingTimeHistogram {
    bucket_width: Duration,
    width_micros: i64,
    max_buckets: usize,
    counts: BTreeMap<DateTime<Utc>, u64>,
}

impl RollingTimeHistogram {
    pub fn new(max_buckets: usize, bucket_width: Duration) -> Result<Self, DensityError> {
        if max_buckets == 0 {
            return Err(DensityError::InvalidConfig(
                "max_buckets must be at least 1".into(),
            ));
        }
        let width_micros = bucket_width
            .num_microseconds()
            .filter(|&us| us > 0)
            .ok_or_else(|| {
                DensityError::InvalidConfig(format!(
                    "bucket width {} must be positive",
                    bucket_width
                ))
            })?;

        Ok(RollingTimeHistogram {
            bucket_width,
            width_micros,
            max_buckets,
            counts: BTreeMap::new(),
        })
    }

    pub fn bucket_width(&self) -> Duration {
        self.bucket_width
    }

    pub fn max_buckets(&self) -> usize {
        self.max_buckets
    }

    /// Count one arrival at `instant`
    pub fn record(&mut self, instant: DateTime<Utc>) {
        let Some(bucket) = self.bucket_start(instant) else {
            log::warn!("cannot bucket {}, ignored", instant);
            return;
        };
        *self.counts.entry(bucket).or_insert(0) += 1;

        while self.counts.len() > self.max_buckets {
            if let Some((start, count)) = self.counts.pop_first() {
                log::trace!("evicted bucket {} holding {} arrivals", start, count);
            }
        }
    }

    fn bucket_start(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let micros = instant.timestamp_micros();
        DateTime::from_timestamp_micros(micros.div_euclid(self.width_micros) * self.width_micros)
    }

    /// Bucket start to arrival count, earliest first
    pub fn counts(&self) -> &BTreeMap<DateTime<Utc>, u64> {
        &self.counts
    }

    pub fn count_at(&self, bucket_start: DateTime<Utc>) -> u64 {
        self.counts.get(&bucket_start).copied().unwrap_or(0)
    }

    pub fn bucket_count(&self) -> usize {
        self.counts.len()
    }

    pub fn total_count(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// From the earliest retained bucket start to the latest
    pub fn spanning_window(&self) -> Result<TimeWindow, DensityError> {
        match (self.counts.keys().next(), self.counts.keys().next_back()) {
            (Some(&start), Some(&end)) => Ok(TimeWindow { start, end }),
            _ => Err(DensityError::Empty),
        }
    }

    /// Every bucket start across the spanning window, including empty ones
    pub fn bucketed_timeline(&self) -> Result<impl Iterator<Item = DateTime<Utc>>, DensityError> {
        Ok(self.spanning_window()?.steps(self.bucket_width))
    }
}

impl Default for RollingTimeHistogram {
    fn default() -> Self {
        RollingTimeHistogram {
            bucket_width: Duration::seconds(DEFAULT_BUCKET_SECONDS),
            width_micros: DEFAULT_BUCKET_SECONDS * 1_000_000,
            max_buckets: DEFAULT_MAX_BUCKETS,
            counts: BTreeMap::new(),
        }
    }
}
