//! Airborne event analytics core
//!
//! Platform-independent building blocks for ingesting aircraft position
//! reports, labelling aircraft pairs, giving detected events a stable content
//! identity, and aggregating those events into bounded, mergeable statistics.
//!
//! Nothing in this crate opens files or sockets. Readers consume any
//! [`std::io::BufRead`]; everything else is pure computation.
//!
//! # Modules
//!
//! - [`protocol`]: OpenARIA CSV position reports, NOP radar hits, line reader
//! - [`conflict`]: Conflict angle classification of two headings
//! - [`hashing`]: Canonical JSON and content hashing
//! - [`event`]: The airborne event record
//! - [`metrics`]: Rolling time histogram, daily metrics, event summarizer
//!
//! # Example
//!
//! ```
//! use aria_core::conflict::ConflictAngle;
//! use aria_core::protocol::PositionReport;
//!
//! let report = PositionReport::parse(",,2018-03-24T14:41:09.371Z,vehicle1,40.7,-74.0,3400").unwrap();
//! assert_eq!(report.link_id(), "vehicle1");
//! assert_eq!(report.altitude_ft(), Some(3400.0));
//!
//! assert_eq!(ConflictAngle::between(10.0, 350.0).unwrap(), ConflictAngle::Same);
//! ```

pub mod conflict;
pub mod event;
pub mod hashing;
pub mod metrics;
pub mod protocol;

pub use conflict::{ConflictAngle, ConflictAngleError};
pub use event::{AirborneEvent, EventError, Facility};
pub use hashing::HashError;
pub use metrics::{DailyMetric, DensityError, EventSummarizer, MetricError, RollingTimeHistogram};
pub use protocol::{PositionReader, PositionReport, RecordError};

/// Any error raised by this crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    ConflictAngle(#[from] ConflictAngleError),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Metric(#[from] MetricError),
    #[error(transparent)]
    Density(#[from] DensityError),
}
