//! Shard per input processing
//!
//! Every input file is handled by its own worker thread with its own
//! histogram or summarizer. Nothing is shared between workers; the calling
//! thread merges their results once they finish. Hashed events are funnelled
//! back to the calling thread over a bounded channel, so the sink never
//! leaves it.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, ScopedJoinHandle};

use anyhow::{anyhow, Context};
use aria_core::event::AirborneEvent;
use aria_core::metrics::{EventSummarizer, RollingTimeHistogram};
use aria_core::protocol::{LineParser, PositionReader, WireFormat};
use chrono::SecondsFormat;
use crossbeam::channel::{self, Sender};

use crate::config::DensityConfig;
use crate::input::open_input;
use crate::registry::EventSink;

/// Events buffered between workers and the sink
const EVENT_QUEUE_DEPTH: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardStats {
    pub input: PathBuf,
    pub line_count: u64,
    pub error_count: u64,
}

impl ShardStats {
    fn new(input: &Path) -> Self {
        ShardStats {
            input: input.to_path_buf(),
            line_count: 0,
            error_count: 0,
        }
    }

    fn log(&self) {
        log::info!(
            "{}: {} lines, {} skipped",
            self.input.display(),
            self.line_count,
            self.error_count
        );
    }
}

#[derive(Debug)]
pub struct DensityShard {
    pub stats: ShardStats,
    pub histogram: RollingTimeHistogram,
}

#[derive(Debug)]
pub struct SummaryRun {
    pub summarizer: EventSummarizer,
    pub shards: Vec<ShardStats>,
}

fn join_worker<T>(worker: ScopedJoinHandle<'_, anyhow::Result<T>>) -> anyhow::Result<T> {
    worker
        .join()
        .map_err(|_| anyhow!("worker thread panicked"))?
}

/// Count position report arrivals per time bucket, one histogram per input
pub fn audit_density(
    inputs: &[PathBuf],
    parser: LineParser,
    density: &DensityConfig,
) -> anyhow::Result<Vec<DensityShard>> {
    let template = density.histogram()?;

    thread::scope(|scope| {
        let workers: Vec<_> = inputs
            .iter()
            .map(|path| {
                let histogram = template.clone();
                scope.spawn(move || density_shard(path, parser, histogram))
            })
            .collect();

        workers.into_iter().map(join_worker).collect()
    })
}

fn density_shard(
    path: &Path,
    parser: LineParser,
    mut histogram: RollingTimeHistogram,
) -> anyhow::Result<DensityShard> {
    let mut reader = PositionReader::with_parser(open_input(path)?, parser);
    for report in reader.by_ref() {
        histogram.record(report.time());
    }
    if let Some(e) = reader.take_io_error() {
        return Err(e).with_context(|| format!("reading {}", path.display()));
    }

    let stats = ShardStats {
        input: path.to_path_buf(),
        line_count: reader.line_count(),
        error_count: reader.error_count(),
    };
    stats.log();

    Ok(DensityShard { stats, histogram })
}

/// One `<bucket start>,<count>` line per timeline step of every shard
pub fn write_density(shards: &[DensityShard], out: &mut impl Write) -> anyhow::Result<()> {
    for shard in shards {
        let Ok(timeline) = shard.histogram.bucketed_timeline() else {
            log::warn!("{}: no position reports", shard.stats.input.display());
            continue;
        };
        for start in timeline {
            writeln!(
                out,
                "{},{}",
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
                shard.histogram.count_at(start)
            )?;
        }
    }
    Ok(())
}

/// Hash every event, pass it to `sink`, and summarize all inputs together
pub fn summarize_events(
    inputs: &[PathBuf],
    sink: &mut dyn EventSink,
) -> anyhow::Result<SummaryRun> {
    let (sender, receiver) = channel::bounded::<String>(EVENT_QUEUE_DEPTH);

    thread::scope(|scope| {
        // dropping the receiver on an early return unblocks the workers
        let receiver = receiver;

        let workers: Vec<_> = inputs
            .iter()
            .map(|path| {
                let sender = sender.clone();
                scope.spawn(move || summarize_shard(path, sender))
            })
            .collect();
        drop(sender);

        for json in receiver.iter() {
            sink.accept(&json)?;
        }
        sink.flush()?;

        let mut summarizer = EventSummarizer::new();
        let mut shards = Vec::with_capacity(workers.len());
        for worker in workers {
            let (partial, stats) = join_worker(worker)?;
            summarizer.ingest_all(&partial);
            shards.push(stats);
        }

        Ok(SummaryRun { summarizer, shards })
    })
}

fn summarize_shard(
    path: &Path,
    sender: Sender<String>,
) -> anyhow::Result<(EventSummarizer, ShardStats)> {
    let mut summarizer = EventSummarizer::new();
    let mut stats = ShardStats::new(path);

    for line in open_input(path)?.lines() {
        stats.line_count += 1;
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                // the offending line was consumed, carry on with the next one
                stats.error_count += 1;
                log::debug!("{}:{}: {}", path.display(), stats.line_count, e);
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };

        let event = match AirborneEvent::from_json(&line) {
            Ok(event) => event.with_unique_id(),
            Err(e) => {
                stats.error_count += 1;
                log::debug!("{}:{}: {}", path.display(), stats.line_count, e);
                continue;
            }
        };
        if let Err(e) = summarizer.accept(&event) {
            stats.error_count += 1;
            log::warn!("{}:{}: {}", path.display(), stats.line_count, e);
            continue;
        }
        if sender.send(event.as_json()).is_err() {
            log::debug!("event sink closed, {} stopped early", path.display());
            break;
        }
    }

    stats.log();
    Ok((summarizer, stats))
}

/// Every daily metric as canonical JSON, ordered by date then facility
pub fn write_summaries(summarizer: &EventSummarizer, out: &mut impl Write) -> anyhow::Result<()> {
    for metric in summarizer.all_summaries() {
        writeln!(out, "{}", metric.as_canonical_json()?)?;
    }
    Ok(())
}

/// Rewrite NOP radar hits as OpenARIA CSV, inputs in order
pub fn convert_nop(inputs: &[PathBuf], out: &mut impl Write) -> anyhow::Result<Vec<ShardStats>> {
    let mut shards = Vec::with_capacity(inputs.len());

    for path in inputs {
        let mut reader = PositionReader::new(open_input(path)?, WireFormat::Nop);
        for report in reader.by_ref() {
            writeln!(out, "{}", report.raw_text())?;
        }
        if let Some(e) = reader.take_io_error() {
            return Err(e).with_context(|| format!("reading {}", path.display()));
        }

        let stats = ShardStats {
            input: path.clone(),
            line_count: reader.line_count(),
            error_count: reader.error_count(),
        };
        stats.log();
        shards.push(stats);
    }
    Ok(shards)
}
