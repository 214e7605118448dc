//! Keysync - Mirror Master Vault decks into Decks of KeyForge and The Crucible
//!
//! This is the main entry point for the keysync command-line app.

use clap::{Parser, Subcommand};
use decks::Service;
use log::error;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "keysync")]
#[command(about = "Sync your KeyForge decks from the Master Vault to DoK and The Crucible")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to the deck database
    #[arg(long, value_name = "PATH", global = true)]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full sync: Master Vault inventory, then every enabled target
    Sync {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync only if the daily auto-sync is enabled and due
    Auto,
    /// Capture a token from an exported site snapshot (cookies + local storage)
    Capture {
        /// Service the snapshot was taken on (mv, dok, tco)
        service: Service,
        /// Snapshot JSON file
        snapshot: PathBuf,
    },
    /// Store a token for a service directly
    Token {
        /// Service (mv, dok, tco)
        service: Service,
        /// Token value (for tco, the refresh token JSON)
        value: String,
    },
    /// Open a service's login page in the browser
    Login {
        /// Service (mv, dok, tco)
        service: Service,
    },
    /// Forget a service's stored token
    Logout {
        /// Service (mv, dok, tco)
        service: Service,
    },
    /// Show or change sync settings
    Settings {
        /// Import into Decks of KeyForge
        #[arg(long, value_name = "BOOL")]
        dok: Option<bool>,
        /// Import into The Crucible Online
        #[arg(long, value_name = "BOOL")]
        tco: Option<bool>,
        /// Sync automatically once a day (`keysync auto`)
        #[arg(long, value_name = "BOOL")]
        daily: Option<bool>,
    },
    /// Show per-service sync progress and login state
    Status {
        /// Also list every deck with its per-service marks
        #[arg(long)]
        decks: bool,
    },
    /// Delete all stored decks, tokens and sync history
    Clear {
        /// Confirm deleting everything
        #[arg(long)]
        yes: bool,
    },
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    if let Err(e) = commands::run(cli.command, cli.db_path) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
