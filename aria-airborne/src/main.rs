use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use aria_airborne::{pipeline, FormatRegistry, PipelineConfig, SinkRegistry};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

#[derive(Parser)]
#[command(name = "aria-airborne", version)]
#[command(about = "Audit position feeds and summarize airborne events", long_about = None)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// Config file, defaults to <config dir>/aria-airborne/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Input format tag (csv, nop)
    #[arg(long, global = true)]
    format: Option<String>,

    /// Event sink tag (stdout, discard)
    #[arg(long, global = true)]
    sink: Option<String>,

    #[arg(long, global = true)]
    bucket_seconds: Option<u32>,

    #[arg(long, global = true)]
    max_buckets: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count position reports per time bucket
    Density {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Hash airborne events (JSON lines) and print daily metrics
    Summarize {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Translate NOP radar hits to OpenARIA CSV
    ConvertNop {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

impl Cli {
    fn config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;

        if let Some(format) = &self.format {
            config.input_format = format.clone();
        }
        if let Some(sink) = &self.sink {
            config.sink = sink.clone();
        }
        if let Some(seconds) = self.bucket_seconds {
            config.density.bucket_seconds = seconds;
        }
        if let Some(max) = self.max_buckets {
            config.density.max_buckets = max;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let config = cli.config()?;
    log::debug!("{:?}", config);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match &cli.command {
        Commands::Density { inputs } => {
            let parser = FormatRegistry::new().resolve(&config.input_format)?;
            let shards = pipeline::audit_density(inputs, parser, &config.density)?;
            pipeline::write_density(&shards, &mut out)?;
        }
        Commands::Summarize { inputs } => {
            let mut sink = SinkRegistry::new().create(&config.sink)?;
            let run = pipeline::summarize_events(inputs, sink.as_mut())?;
            log::info!(
                "{} events over {} days",
                run.summarizer.event_count(),
                run.summarizer.date_keys().count()
            );
            pipeline::write_summaries(&run.summarizer, &mut out)?;
        }
        Commands::ConvertNop { inputs } => {
            pipeline::convert_nop(inputs, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
