//! Marquee CLI - Headless descriptor and source toolkit
//!
//! Features:
//! - Descriptor parsing and validation
//! - Variant selection by quality, language and viewport
//! - Source re-probing over HTTP

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Marquee CLI - Media descriptor toolkit
#[derive(Parser)]
#[command(name = "marquee-cli")]
#[command(version)]
#[command(about = "Inspect media descriptors and exercise source selection", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    /// Player configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a descriptor and list its items, variants and representations
    Inspect {
        /// URL, path or inline JSON of the descriptor
        descriptor: String,
    },

    /// Run variant selection against a descriptor
    Select {
        /// URL, path or inline JSON of the descriptor
        descriptor: String,

        /// Index of the item to select from
        #[arg(short, long, default_value = "0")]
        item: usize,

        /// Preferred quality (e.g. 720)
        #[arg(short, long)]
        quality: Option<u32>,

        /// Preferred language (e.g. en)
        #[arg(short, long)]
        language: Option<String>,

        /// Viewport height in CSS pixels
        #[arg(long, default_value = "0")]
        viewport_height: f64,

        /// Device pixel ratio
        #[arg(long, default_value = "1")]
        dpr: f64,
    },

    /// Check whether a source is reachable
    Probe {
        /// Source URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { descriptor } => {
            commands::inspect(&config, &descriptor, &cli.format).await?;
        }
        Commands::Select { descriptor, item, quality, language, viewport_height, dpr } => {
            let request = commands::SelectRequest {
                item,
                quality,
                language,
                viewport_height,
                dpr,
            };
            commands::select(&config, &descriptor, request, &cli.format).await?;
        }
        Commands::Probe { url } => {
            commands::probe(&url, &cli.format).await?;
        }
    }

    Ok(())
}
