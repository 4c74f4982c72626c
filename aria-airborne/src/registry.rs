//! Tag keyed registries of input formats and event sinks
//!
//! The configuration names a format and a sink by tag; both are resolved
//! once at startup. Custom entries can be registered before resolving.

use std::collections::HashMap;
use std::io::{self, BufWriter, Stdout, Write};

use aria_core::protocol::{LineParser, WireFormat};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown {kind} '{tag}', known: [{}]", .known.join(", "))]
    UnknownTag {
        kind: &'static str,
        tag: String,
        known: Vec<String>,
    },
}

/// Destination for hashed events, one compact JSON document at a time
pub trait EventSink {
    fn accept(&mut self, json: &str) -> anyhow::Result<()>;

    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

type SinkFactory = Box<dyn Fn() -> Box<dyn EventSink> + Send + Sync>;

pub struct FormatRegistry {
    parsers: HashMap<String, LineParser>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    /// Registry holding `csv` and `nop`
    pub fn new() -> Self {
        let mut registry = FormatRegistry {
            parsers: HashMap::new(),
        };
        registry.register("csv", WireFormat::AriaCsv.parser());
        registry.register("nop", WireFormat::Nop.parser());
        registry
    }

    pub fn register(&mut self, tag: &str, parser: LineParser) {
        self.parsers.insert(tag.to_string(), parser);
    }

    pub fn resolve(&self, tag: &str) -> Result<LineParser, RegistryError> {
        self.parsers
            .get(tag)
            .copied()
            .ok_or_else(|| RegistryError::UnknownTag {
                kind: "input format",
                tag: tag.to_string(),
                known: self.tags(),
            })
    }

    pub fn tags(&self) -> Vec<String> {
        sorted_keys(&self.parsers)
    }
}

pub struct SinkRegistry {
    factories: HashMap<String, SinkFactory>,
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkRegistry {
    /// Registry holding `stdout` and `discard`
    pub fn new() -> Self {
        let mut registry = SinkRegistry {
            factories: HashMap::new(),
        };
        registry.register("stdout", || Box::new(StdoutSink::new()));
        registry.register("discard", || Box::new(DiscardSink::default()));
        registry
    }

    pub fn register<F>(&mut self, tag: &str, factory: F)
    where
        F: Fn() -> Box<dyn EventSink> + Send + Sync + 'static,
    {
        self.factories.insert(tag.to_string(), Box::new(factory));
    }

    pub fn create(&self, tag: &str) -> Result<Box<dyn EventSink>, RegistryError> {
        self.factories
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| RegistryError::UnknownTag {
                kind: "sink",
                tag: tag.to_string(),
                known: self.tags(),
            })
    }

    pub fn tags(&self) -> Vec<String> {
        sorted_keys(&self.factories)
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut tags: Vec<String> = map.keys().cloned().collect();
    tags.sort();
    tags
}

/// Writes each event on its own line to standard output
pub struct StdoutSink {
    out: BufWriter<Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        StdoutSink {
            out: BufWriter::new(io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for StdoutSink {
    fn accept(&mut self, json: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{}", json)?;
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Counts and drops every event
#[derive(Debug, Default)]
pub struct DiscardSink {
    accepted: u64,
}

impl DiscardSink {
    pub fn accepted(&self) -> u64 {
        self.accepted
    }
}

impl EventSink for DiscardSink {
    fn accept(&mut self, _json: &str) -> anyhow::Result<()> {
        self.accepted += 1;
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        log::debug!("discarded {} events", self.accepted);
        Ok(())
    }
}
