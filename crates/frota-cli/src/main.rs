//! CLI for NF-e invoice extraction and driver movement classification.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, extract, session, track};

/// frota - Extract NF-e invoices and classify fleet movement
#[derive(Parser)]
#[command(name = "frota")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a single invoice from a service payload or OCR text
    Extract(extract::ExtractArgs),

    /// Extract many invoices
    Batch(batch::BatchArgs),

    /// Classify drivers in a tracking snapshot as moving or stopped
    Track(track::TrackArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Manage the stored login session
    Session(session::SessionArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Track(args) => track::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
        Commands::Session(args) => session::run(args, config_path).await,
    }
}
