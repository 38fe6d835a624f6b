//! # Video Metadata Updater - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Costruzione della configurazione (file JSON + override da CLI)
//! - Verifica di ffmpeg/ffprobe e avvio del processor
//! - Ctrl-C cancella il run in corso
//!
//! ## Esempio di utilizzo:
//! ```bash
//! vmu /media/tv --workers 4 --retries 2 --results results.json --verbose
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use video_metadata_updater::{platform, report, Config, Processor, RunSummary, Toolchain};

#[derive(Parser)]
#[command(name = "vmu")]
#[command(about = "Rewrite embedded video metadata from NFO sidecars")]
struct Args {
    /// Directory containing the video files to update
    media_directory: PathBuf,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Extra attempts for files that failed
    #[arg(short, long)]
    retries: Option<u32>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write every result to this JSON file
    #[arg(long)]
    results: Option<PathBuf>,

    /// Write failed results to this JSON file
    #[arg(long)]
    failures: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging, RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if !args.media_directory.is_dir() {
        return Err(anyhow::anyhow!(
            "Media directory does not exist: {}",
            args.media_directory.display()
        ));
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if args.results.is_some() {
        config.results_file = args.results;
    }
    if args.failures.is_some() {
        config.failures_file = args.failures;
    }
    if args.no_progress {
        config.show_progress = false;
    }
    config.validate()?;

    let tools = platform::check_dependencies(&config)?;
    info!("Using {} and {}", tools.ffmpeg.display(), tools.ffprobe.display());

    let processor = Processor::new(&config, Toolchain::from_tools(&tools, &config));

    let token = processor.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, waiting for files in progress...");
            token.cancel();
        }
    });

    let started = std::time::Instant::now();
    let results = processor.process_directory(&args.media_directory).await?;

    if let Some(path) = &config.results_file {
        report::save_results(path, &results).await?;
    }
    if let Some(path) = &config.failures_file {
        report::save_failures(path, &results).await?;
    }

    for (status, count) in report::status_counts(&results) {
        info!("{}: {}", status, count);
    }
    info!(
        "{} in {:.1}s",
        RunSummary::from_results(&results).format_summary(),
        started.elapsed().as_secs_f64()
    );

    Ok(())
}
