//! Beatwatch CLI
//!
//! Operator commands for the welfare monitoring store: migrations, SLA
//! sweeps and notification dispatch.

use std::path::PathBuf;

use beatwatch_core::logging_facility::{self, Profile};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "beatwatch")]
#[command(about = "Beatwatch - field-visit welfare monitoring", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML); missing files fall back to defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log profile: dev, prod or test
    #[arg(long, global = true, default_value = "dev")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Schema migrations
    Db(commands::db::DbArgs),
    /// Service-level monitoring
    Sla(commands::sla::SlaArgs),
    /// Notification outbox
    Notify(commands::notify::NotifyArgs),
}

fn main() {
    let cli = Cli::parse();

    let Some(profile) = Profile::parse(&cli.log) else {
        eprintln!("Error: unknown log profile '{}'", cli.log);
        std::process::exit(2);
    };
    logging_facility::init(profile);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Db(args) => commands::db::execute(args),
        Commands::Sla(args) => commands::sla::execute(args, config),
        Commands::Notify(args) => commands::notify::execute(args, config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
