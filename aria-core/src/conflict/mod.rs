//! Conflict Angle Classification
//!
//! Labels how two aircraft come into conflict: are they travelling the same
//! general direction, crossing each other's paths, or heading roughly
//! towards one another?
//!
//! # Example
//!
//! ```
//! use aria_core::conflict::ConflictAngle;
//!
//! assert_eq!(ConflictAngle::between(0.0, 45.0).unwrap(), ConflictAngle::Same);
//! assert_eq!(ConflictAngle::between(0.0, 90.0).unwrap(), ConflictAngle::Crossing);
//! assert_eq!(ConflictAngle::between(90.0, 270.0).unwrap(), ConflictAngle::Opposite);
//! ```

mod angle;

pub use angle::*;
