//! # Image Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (default < file JSON < flag CLI)
//! - Creazione dell'optimizer e avvio del run
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (path, quality, backup, report, etc.)
//! 2. Configura il logging su stderr (INFO o DEBUG, `RUST_LOG` ha la precedenza)
//! 3. Carica il file di configurazione, se presente, e applica i flag
//! 4. Istanzia ImageOptimizer e avvia il processo di ottimizzazione
//! 5. Exit code 1 su errori di run, 0 altrimenti (anche senza immagini)
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-optimizer ./public/images --quality 70 --no-backup --report build/images.html
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use image_optimizer::json_output::JsonMessage;
use image_optimizer::{Config, ImageOptimizer, IntermediateFormat};

#[derive(Parser)]
#[command(name = "image-optimizer")]
#[command(about = "Re-encode project images in place and write an HTML size report")]
struct Args {
    /// Directories to scan recursively (default: common asset directories)
    paths: Vec<PathBuf>,

    /// Output quality (1-100) [default: 80]
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Backup directory path [default: ./images-backup]
    #[arg(short, long, conflicts_with = "no_backup")]
    backup: Option<PathBuf>,

    /// Disable backup
    #[arg(long)]
    no_backup: bool,

    /// Report file path [default: ./optimization-report.html]
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Intermediate re-encode format [default: webp]
    #[arg(long, value_enum)]
    format: Option<IntermediateFormat>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output progress and status as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let json_output = args.json;
    let result = run(args).await;

    if let Err(ref e) = result {
        if json_output {
            JsonMessage::error(e.to_string(), Some(format!("{:#}", e))).emit();
        }
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args).await?;
    let optimizer = ImageOptimizer::new(config)?;
    optimizer.run().await?;
    Ok(())
}

/// Build the run configuration: defaults, then config file, then flags
async fn load_config(args: Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
            }
            info!("Using config file: {}", path.display());
            Config::from_file(path).await?
        }
        None => match Config::default_file_path() {
            Some(path) if path.exists() => {
                info!("Using config file: {}", path.display());
                Config::from_file(&path).await?
            }
            _ => Config::default(),
        },
    };

    if !args.paths.is_empty() {
        config.search_paths = args.paths;
    }
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(report) = args.report {
        config.report_path = report;
    }
    if args.no_backup {
        config.backup_dir = None;
    } else if let Some(backup) = args.backup {
        config.backup_dir = Some(backup);
    }
    if args.json {
        config.json_output = true;
    }

    config.validate()?;
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}
