//! Airborne Event Records
//!
//! An airborne event is produced by the (external) detection stage whenever
//! two tracks come close enough to be interesting. This crate only needs a
//! few of its fields, but keeps the whole record, in its original key order,
//! so that its content hash is reproducible.
//!
//! Required keys:
//!
//! | Key                | Type                 |
//! |--------------------|----------------------|
//! | `facility`         | string               |
//! | `eventEpochMsTime` | integer (epoch ms)   |
//! | `eventScore`       | number               |

mod airborne;

pub use airborne::*;
