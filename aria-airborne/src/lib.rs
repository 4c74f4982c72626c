//! Command line pipeline around `aria-core`
//!
//! Resolves the configured input format and event sink from their
//! registries, opens (optionally gzipped) input files and processes each on
//! its own worker thread.

pub mod config;
pub mod input;
pub mod pipeline;
pub mod registry;

pub use config::{ConfigError, DensityConfig, PipelineConfig};
pub use registry::{EventSink, FormatRegistry, RegistryError, SinkRegistry};
