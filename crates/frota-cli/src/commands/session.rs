//! Session command - inspect and manage the stored login session.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use console::style;
use tracing::debug;

use frota_core::{CachedSessionStore, FileSessionStore, FrotaConfig, Session, SessionStore};

use super::{config_file, default_session_path};

/// Arguments for the session command.
#[derive(Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Show the stored session
    Show {
        /// Print the full token
        #[arg(long)]
        reveal: bool,
    },

    /// Store a session
    Set(SetArgs),

    /// Remove the stored session
    Clear,

    /// Show session file path
    Path,
}

#[derive(Args)]
struct SetArgs {
    /// Access token
    #[arg(long)]
    token: String,

    /// User identifier
    #[arg(long)]
    user_id: String,

    /// Company identifier
    #[arg(long)]
    company_id: String,

    /// Expiry time (RFC 3339)
    #[arg(long, conflicts_with = "expires_in_minutes")]
    expires_at: Option<String>,

    /// Expiry relative to now
    #[arg(long)]
    expires_in_minutes: Option<i64>,
}

pub async fn run(args: SessionArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = session_path(config_path)?;
    debug!("Using session file {}", path.display());

    let store = CachedSessionStore::new(FileSessionStore::new(path));

    match args.command {
        SessionCommand::Show { reveal } => show_session(&store, reveal),
        SessionCommand::Set(set_args) => set_session(&store, set_args),
        SessionCommand::Clear => clear_session(&store),
        SessionCommand::Path => {
            println!("Session file: {}", store.inner().path().display());
            Ok(())
        }
    }
}

/// Session file from the config when one is present, else the default location.
fn session_path(config_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let file = config_file(config_path);
    let config = if file.exists() {
        FrotaConfig::from_file(&file)?
    } else {
        FrotaConfig::default()
    };

    Ok(config.session.file.unwrap_or_else(default_session_path))
}

fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

fn show_session<S: SessionStore>(store: &S, reveal: bool) -> anyhow::Result<()> {
    let Some(session) = store.load()? else {
        println!("{} No active session.", style("ℹ").blue());
        return Ok(());
    };

    let token = if reveal {
        session.token.clone()
    } else {
        mask(&session.token)
    };

    println!("Token:   {}", token);
    println!("User:    {}", session.user_id);
    println!("Company: {}", session.company_id);
    match session.expires_at {
        Some(at) => println!("Expires: {}", at.to_rfc3339()),
        None => println!("Expires: never"),
    }

    Ok(())
}

fn set_session<S: SessionStore>(store: &S, args: SetArgs) -> anyhow::Result<()> {
    let expires_at: Option<DateTime<Utc>> = match (args.expires_at, args.expires_in_minutes) {
        (Some(s), _) => Some(
            DateTime::parse_from_rfc3339(&s)
                .map_err(|e| anyhow::anyhow!("Invalid --expires-at timestamp '{}': {}", s, e))?
                .with_timezone(&Utc),
        ),
        (None, Some(minutes)) => Some(Utc::now() + Duration::minutes(minutes)),
        (None, None) => None,
    };

    let mut session = Session::new(args.token, args.user_id, args.company_id);
    if let Some(at) = expires_at {
        session = session.with_expiry(at);
    }

    store.save(&session)?;

    println!(
        "{} Session stored for user {}",
        style("✓").green(),
        session.user_id
    );

    Ok(())
}

fn clear_session<S: SessionStore>(store: &S) -> anyhow::Result<()> {
    store.clear()?;
    println!("{} Session cleared", style("✓").green());
    Ok(())
}
