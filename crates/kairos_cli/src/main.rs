//! Kairos CLI
//!
//! Command-line front end for a Kairos database directory.
//!
//! # Commands
//!
//! - `user add` - Register a user
//! - `event create|update|show|delete` - Manage events
//! - `versions`, `changelog`, `diff` - Read an event's history
//! - `rollback` - Restore an event to a stored version
//! - `share grant|revoke|list` - Manage per-event roles
//! - `inspect` - Display database statistics

mod commands;

use clap::{Parser, Subcommand};
use commands::{Context, OutputFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Kairos event database tools.
#[derive(Parser)]
#[command(name = "kairos")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Id of the user performing the command
    #[arg(global = true, short, long)]
    user: Option<u64>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: commands::user::UserCommand,
    },

    /// Manage events
    Event {
        #[command(subcommand)]
        action: commands::event::EventCommand,
    },

    /// List the stored versions of an event
    Versions {
        /// Event id
        event: u64,
    },

    /// Show the changelog of an event
    Changelog {
        /// Event id
        event: u64,
    },

    /// Compare two versions of an event
    Diff {
        /// Event id
        event: u64,
        /// Left version id
        left: u64,
        /// Right version id
        right: u64,
    },

    /// Restore an event to a stored version
    Rollback {
        /// Event id
        event: u64,
        /// Version id to restore
        version: u64,
    },

    /// Manage who an event is shared with
    Share {
        #[command(subcommand)]
        action: commands::share::ShareCommand,
    },

    /// Display database statistics
    Inspect,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("Kairos CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Kairos Core v{}", kairos_core::VERSION);
        return Ok(());
    }

    let path = cli.path.ok_or("Database path required (--path)")?;
    let ctx = Context::open(&path, cli.user, cli.format)?;

    match cli.command {
        Commands::User { action } => commands::user::run(&ctx, action)?,
        Commands::Event { action } => commands::event::run(&ctx, action)?,
        Commands::Versions { event } => commands::history::versions(&ctx, event)?,
        Commands::Changelog { event } => commands::history::changelog(&ctx, event)?,
        Commands::Diff { event, left, right } => {
            commands::history::diff(&ctx, event, left, right)?;
        }
        Commands::Rollback { event, version } => {
            commands::history::rollback(&ctx, event, version)?;
        }
        Commands::Share { action } => commands::share::run(&ctx, action)?,
        Commands::Inspect => commands::inspect::run(&ctx)?,
        Commands::Version => {}
    }

    Ok(())
}
