//! Position Report Wire Formats
//!
//! This module parses the two interchangeable text formats that carry
//! aircraft position data:
//!
//! - **OpenARIA CSV**: `partA,partB,time,linkId,lat,long[,altitude[,...]]`
//! - **NOP radar hits**: `[RH],STARS,A80_B,07/10/2016,20:03:53.856,...`
//!
//! Both formats are comma delimited and are indexed once per line by
//! recording where the commas are. Individual fields are then sliced out of
//! the original text on demand instead of splitting the line again.
//!
//! NOP hits are converted to OpenARIA CSV, so everything downstream works
//! with a single [`PositionReport`] type.
//!
//! # Example
//!
//! ```
//! use aria_core::protocol::{PositionReader, WireFormat};
//!
//! let data = ",,2018-03-24T14:41:09.371Z,vehicle1,40.7,-74.0\nnot a report\n";
//! let mut reader = PositionReader::new(data.as_bytes(), WireFormat::AriaCsv);
//!
//! let reports: Vec<_> = reader.by_ref().collect();
//! assert_eq!(reports.len(), 1);
//! assert_eq!(reader.line_count(), 2);
//! assert_eq!(reader.error_count(), 1);
//! ```

mod aria_csv;
mod delimited;
mod nop;
mod reader;

pub use aria_csv::{PositionReport, MIN_FIELD_COUNT};
pub use delimited::DelimitedText;
pub use nop::{nop_to_aria_csv, NopRadarHit, RADAR_HIT_PREFIX};
pub use reader::{LineParser, PositionReader, WireFormat};

/// Errors raised while decoding a single position line
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// The line cannot be decoded into a position report
    #[error("malformed record: {0}")]
    Malformed(String),

    /// A field beyond the last delimiter was requested
    #[error("requested token {index} but there are only {delimiters} delimiters")]
    IndexOutOfRange { index: usize, delimiters: usize },
}

impl RecordError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        RecordError::Malformed(reason.into())
    }
}
