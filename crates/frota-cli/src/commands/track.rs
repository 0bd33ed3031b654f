//! Track command - classify a tracking snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Args;
use console::style;
use serde::Deserialize;
use tracing::info;

use frota_core::{DriverLocation, FleetSnapshot, MovementClassifier, MovementStatus};

use super::extract::OutputFormat;
use super::load_config;

/// Arguments for the track command.
#[derive(Args)]
pub struct TrackArgs {
    /// Tracking snapshot (JSON array of drivers, or an object with "drivers")
    #[arg(required = true)]
    input: PathBuf,

    /// Reference time (RFC 3339), defaults to now
    #[arg(long)]
    now: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Only list stopped drivers
    #[arg(long)]
    stopped_only: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    List(Vec<DriverLocation>),
    Wrapped { drivers: Vec<DriverLocation> },
}

pub async fn run(args: TrackArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let now = match &args.now {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map_err(|e| anyhow::anyhow!("Invalid --now timestamp '{}': {}", s, e))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let content = fs::read_to_string(&args.input)?;
    let drivers = match serde_json::from_str::<Snapshot>(&content)
        .map_err(|e| anyhow::anyhow!("Invalid tracking snapshot: {}", e))?
    {
        Snapshot::List(drivers) | Snapshot::Wrapped { drivers } => drivers,
    };

    info!("Classifying {} drivers at {}", drivers.len(), now.to_rfc3339());

    let classifier = MovementClassifier::from_config(&config.tracking);
    let mut snapshot = classifier.classify_fleet(&drivers, now);

    if args.stopped_only {
        snapshot.drivers.retain(|d| d.status == MovementStatus::Stopped);
    }

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&snapshot)?,
        OutputFormat::Csv => format_csv(&snapshot)?,
        OutputFormat::Text => format_text(&snapshot),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_csv(snapshot: &FleetSnapshot) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "driver_id",
        "driver_name",
        "status",
        "speed",
        "last_update",
        "idle_minutes",
    ])?;

    for driver in &snapshot.drivers {
        let speed = driver.speed.map(|s| s.to_string()).unwrap_or_default();
        let idle = driver.idle_minutes.map(|m| m.to_string()).unwrap_or_default();
        wtr.write_record([
            driver.driver_id.as_str(),
            driver.driver_name.as_str(),
            driver.status.as_str(),
            speed.as_str(),
            driver.last_update.as_deref().unwrap_or(""),
            idle.as_str(),
        ])?;
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(snapshot: &FleetSnapshot) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} moving, {} stopped at {}\n",
        style(snapshot.moving).green(),
        style(snapshot.stopped).red(),
        snapshot.generated_at.to_rfc3339()
    ));

    for driver in &snapshot.drivers {
        let status = match driver.status {
            MovementStatus::Moving => style(driver.status.as_str()).green(),
            MovementStatus::Stopped => style(driver.status.as_str()).red(),
        };
        let speed = driver
            .speed
            .map(|s| format!("{:.1} km/h", s))
            .unwrap_or_else(|| "-".to_string());
        let idle = driver
            .idle_minutes
            .map(|m| format!("{} min", m))
            .unwrap_or_else(|| "-".to_string());

        output.push_str(&format!(
            "  {:<8} {:<24} {:<8} {:>12} {:>10}\n",
            driver.driver_id, driver.driver_name, status, speed, idle
        ));
    }

    output
}
