use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use bookview::config::{Overrides, Settings};
use bookview::engine::BookView;
use bookview::feed::FeedReader;
use bookview::telemetry::{self, RunStats};

const IO_BUFFER: usize = 64 * 1024;

/// Replays a binary order feed and writes top-of-book snapshots whenever they change.
#[derive(Debug, Parser)]
#[command(name = "bookview", version)]
struct Cli {
    /// Price levels per side (positional form of --levels)
    #[arg(value_name = "LEVELS", conflicts_with = "levels")]
    levels_pos: Option<usize>,

    /// Feed file (positional form of --input)
    #[arg(value_name = "INPUT", conflicts_with = "input")]
    input_pos: Option<PathBuf>,

    /// Price levels per side
    #[arg(short, long)]
    levels: Option<usize>,

    /// Feed file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Snapshot log written one line per change
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "bookview=debug"
    #[arg(long)]
    log: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            levels: self.levels.or(self.levels_pos),
            input: self.input.clone().or_else(|| self.input_pos.clone()),
            output: self.output.clone(),
            log_filter: self.log.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref(), &cli.overrides())
        .context("loading settings")?;
    telemetry::init_tracing(&settings.log_filter);
    info!(
        levels = settings.levels,
        input = %settings.input.display(),
        output = %settings.output.display(),
        "Starting replay"
    );

    let input = File::open(&settings.input)
        .with_context(|| format!("opening feed {}", settings.input.display()))?;
    let output = File::create(&settings.output)
        .with_context(|| format!("creating {}", settings.output.display()))?;
    let feed = FeedReader::new(BufReader::with_capacity(IO_BUFFER, input));
    let mut out = BufWriter::with_capacity(IO_BUFFER, output);

    let mut view = BookView::new(settings.levels);
    let mut stats = RunStats::start();
    let result = view.run(feed, &mut out, &mut stats);
    out.flush().context("flushing snapshot log")?;
    stats.log_summary(view.registry().len());
    result.with_context(|| format!("replaying {}", settings.input.display()))?;

    Ok(())
}
