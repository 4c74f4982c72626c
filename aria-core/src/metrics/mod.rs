//! Rolling Aggregation
//!
//! Two independent aggregators:
//!
//! - [`RollingTimeHistogram`] counts arrivals per fixed width time bucket and
//!   keeps at most a configured number of buckets, dropping the oldest.
//! - [`DailyMetric`] and [`EventSummarizer`] summarize airborne events per
//!   UTC day and facility. Metrics are immutable values that merge
//!   associatively, so workers can summarize their own shard and a single
//!   coordinator merges the results.
//!
//! Neither is synchronized. Give each worker its own instance.
//!
//! # Example
//!
//! ```
//! use aria_core::event::AirborneEvent;
//! use aria_core::metrics::EventSummarizer;
//! use chrono::{TimeZone, Utc};
//!
//! let time = Utc.timestamp_millis_opt(0).unwrap();
//!
//! let mut shard_a = EventSummarizer::new();
//! shard_a.accept(&AirborneEvent::new("A80", time, 10.0).unwrap()).unwrap();
//!
//! let mut shard_b = EventSummarizer::new();
//! shard_b.accept(&AirborneEvent::new("A80", time, 30.0).unwrap()).unwrap();
//!
//! shard_a.ingest_all(&shard_b);
//! let metric = shard_a.all_summaries().next().unwrap();
//! assert_eq!(metric.event_count(), 2);
//! assert_eq!(metric.avg_event_score(), 20.0);
//! ```

mod daily;
mod density;
mod summarizer;

pub use daily::*;
pub use density::*;
pub use summarizer::*;
