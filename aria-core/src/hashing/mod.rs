//! Canonical JSON and Content Hashing
//!
//! Events get a stable identity by hashing a normalized serialization of
//! their JSON. Normalization removes formatting choices (single or multi
//! line, tabs or spaces, indent width) but keeps the order of object keys:
//! `{"a": 1, "b": 2}` and `{"b": 2, "a": 1}` hash differently.
//!
//! # Example
//!
//! ```
//! use aria_core::hashing::{add_hash, hash_json, HASH_FIELD_NAME};
//!
//! let compact = r#"{"facility":"A80","eventScore":12.5}"#;
//! let pretty = "{\n  \"facility\": \"A80\",\n  \"eventScore\": 12.5\n}";
//! assert_eq!(hash_json(compact).unwrap(), hash_json(pretty).unwrap());
//!
//! let with_id = add_hash(pretty).unwrap();
//! assert!(with_id.starts_with(&format!("{{\n  \"{}\": ", HASH_FIELD_NAME)));
//! ```

mod canonical;

pub use canonical::*;
