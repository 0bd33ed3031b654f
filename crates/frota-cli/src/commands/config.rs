//! Config command - manage configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use frota_core::FrotaConfig;

use super::config_file;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "tracking.stopped_after_minutes")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value (JSON, or a bare string)
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = config_file(config_path);

    match args.command {
        ConfigCommand::Show => show_config(&path),
        ConfigCommand::Init(init_args) => init_config(init_args, &path),
        ConfigCommand::Get { key } => get_config(&path, &key),
        ConfigCommand::Set { key, value } => set_config(&path, &key, &value),
        ConfigCommand::Path => show_path(&path),
    }
}

fn read_or_default(path: &Path) -> anyhow::Result<FrotaConfig> {
    if path.exists() {
        Ok(FrotaConfig::from_file(path)?)
    } else {
        Ok(FrotaConfig::default())
    }
}

fn show_config(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        eprintln!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }

    let config = read_or_default(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn init_config(args: InitArgs, path: &Path) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(|| path.to_path_buf());

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    FrotaConfig::default().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn get_config(path: &Path, key: &str) -> anyhow::Result<()> {
    let json = serde_json::to_value(read_or_default(path)?)?;

    let mut current = &json;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    }

    println!("{}", serde_json::to_string_pretty(current)?);

    Ok(())
}

fn set_config(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let config = read_or_default(path)?;

    let parsed_value: Value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    let mut json = serde_json::to_value(&config)?;
    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        anyhow::bail!("Empty configuration key");
    };

    let mut current = &mut json;
    for part in parents {
        current = current
            .get_mut(*part)
            .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
    }

    match current.as_object_mut() {
        Some(obj) if obj.contains_key(*last) => {
            obj.insert((*last).to_string(), parsed_value.clone());
        }
        Some(_) => anyhow::bail!("Configuration key not found: {}", key),
        None => anyhow::bail!("Cannot set value at non-object path"),
    }

    let config: FrotaConfig = serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    config.save(path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed_value)?
    );

    Ok(())
}

fn show_path(path: &Path) -> anyhow::Result<()> {
    println!("Configuration file: {}", path.display());

    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'frota config init' to create a configuration file.");
    }

    Ok(())
}
