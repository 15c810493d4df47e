//! Marigold CLI - Database migrations and catalog maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (including the session table)
//! marigold-cli migrate
//!
//! # Seed the catalog with demo products
//! marigold-cli seed
//!
//! # Re-derive product slugs from titles (offline maintenance)
//! marigold-cli reslug --dry-run
//! marigold-cli reslug
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the catalog with demo products
//! - `reslug` - Recompute slugs through the strict resolver; halts on
//!   exhaustion instead of inventing suffixes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "marigold-cli")]
#[command(author, version, about = "Marigold CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog with demo products
    Seed,
    /// Recompute product slugs from titles
    Reslug {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::Reslug { dry_run } => commands::reslug::run(dry_run).await?,
    }
    Ok(())
}
