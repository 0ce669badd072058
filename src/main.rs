use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod dataset;
mod error;
mod export;
mod models;
mod output;
mod runner;
mod sampler;
mod session;

use crate::config::Config;
use crate::runner::Runner;
use crate::session::Annotator;

/// Dialogue annotation CLI - Sample conversation records and score them against a rubric
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    config: PathBuf,

    /// Source key to open on startup
    #[arg(short, long)]
    source: Option<String>,

    /// Directory exports are written to, overriding the config
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Verbose output - log every action to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "dialogue_annotator=debug"
    } else {
        "dialogue_annotator=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = Config::from_file(&args.config)?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    tracing::info!(
        config = %args.config.display(),
        sources = config.sources.len(),
        sample_fraction = config.sample_fraction,
        "starting"
    );

    let annotator = Annotator::from_config(&config)?;
    let stdin = io::stdin();
    let mut runner = Runner::new(&config, annotator, stdin.lock(), io::stdout());
    runner.run(args.source)
}
