//! Cheatsheet Composer - multi-column Markdown cheat sheets
//!
//! Entry point for the application. Handles CLI argument parsing,
//! logging initialization, and application bootstrap.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use cheatsheet_composer::app::{Composer, NotificationLevel};
use cheatsheet_composer::config::Config;
use cheatsheet_composer::message::{ExportMessage, Message};
use cheatsheet_composer::surface::FileSurfaceHost;
use cheatsheet_composer::utils::path::{file_stem, is_markdown};

/// Compose Markdown notes side by side and print them as one page
#[derive(Debug, Parser)]
#[command(name = "cheatsheet-composer", version, about)]
struct Cli {
    /// Markdown files, one per column, in order
    files: Vec<PathBuf>,

    /// Number of columns when no files are given
    #[arg(short = 'n', long, value_name = "N")]
    columns: Option<usize>,

    /// Print each column's live preview markup to stdout
    #[arg(short, long)]
    preview: bool,

    /// Write the export document to FILE instead of printing
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Open the print dialog (default when no other output is chosen)
    #[arg(long)]
    print: bool,

    /// Delay in milliseconds before the print surface is removed
    #[arg(long, value_name = "MS")]
    grace_ms: Option<u64>,

    /// Read configuration from FILE
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();

    log::info!("Starting Cheatsheet Composer");

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let texts = read_columns(&cli.files)?;

    let host = FileSurfaceHost::in_cache_dir().context("Could not locate the cache directory")?;
    log::debug!("Print surfaces live in {}", host.dir().display());

    let mut composer = if texts.is_empty() {
        Composer::new(&config, Arc::new(host))
    } else {
        Composer::with_texts(texts, &config, Arc::new(host))
    };

    if cli.preview {
        for (index, fragment) in composer.previews().iter().enumerate() {
            match cli.files.get(index).and_then(|path| file_stem(path)) {
                Some(name) => println!("<!-- column {}: {} -->", index + 1, name),
                None => println!("<!-- column {} -->", index + 1),
            }
            println!("{}", fragment.to_markup());
        }
    }

    if let Some(output) = &cli.output {
        let html = composer.export_document().to_html();
        fs::write(output, html)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        log::info!("Wrote export document to {}", output.display());
    }

    if cli.print || (!cli.preview && cli.output.is_none()) {
        composer.update(Message::Export(ExportMessage::Requested));
        composer.wait_for_exports().await;
    }

    let mut failed = false;
    for notification in composer.take_notifications() {
        eprintln!("{}", notification.message);
        failed |= notification.level == NotificationLevel::Error;
    }
    if failed {
        anyhow::bail!("Export failed");
    }

    Ok(())
}

/// Initialize the logging system
fn init_logging() {
    // Set default log level if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,cheatsheet_composer=debug");
    }

    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();
}

/// Load configuration and apply command line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    if let Some(columns) = cli.columns {
        config.columns.initial_count = columns;
    }
    if let Some(grace_ms) = cli.grace_ms {
        config.export.teardown_grace_ms = grace_ms;
    }
    config.validate().context("Invalid command line option")?;
    Ok(config)
}

/// Read each file into one column's raw text
fn read_columns(files: &[PathBuf]) -> Result<Vec<String>> {
    files
        .iter()
        .map(|path| {
            if !is_markdown(path) {
                log::warn!("{} does not look like a Markdown file", path.display());
            }
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect()
}
