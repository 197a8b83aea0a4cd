//! Outbox dispatch

use std::path::Path;

use beatwatch_core::notify::LogNotificationSender;
use beatwatch_engine::notifications::dispatch_pending;
use beatwatch_store::db;
use beatwatch_store::repo::OutboxRepo;
use clap::{Args, Subcommand};

use super::load_context;

#[derive(Debug, Args)]
pub struct NotifyArgs {
    #[command(subcommand)]
    pub command: NotifyCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotifyCommand {
    /// Deliver pending notifications through the log transport
    Dispatch(DispatchArgs),
    /// Outbox counts by status
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct DispatchArgs {
    #[arg(long, default_value_t = 100)]
    pub limit: u32,

    #[arg(long, default_value = ".beatwatch/beatwatch.db")]
    pub db: String,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long, default_value = ".beatwatch/beatwatch.db")]
    pub db: String,
}

pub fn execute(args: NotifyArgs, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        NotifyCommand::Dispatch(a) => execute_dispatch(a, config),
        NotifyCommand::Status(a) => execute_status(a),
    }
}

fn execute_dispatch(
    args: DispatchArgs,
    config: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = load_context(config)?;
    let conn = db::open_migrated(&args.db)?;
    let report = dispatch_pending(&ctx, &LogNotificationSender, args.limit, &conn)?;
    println!("sent: {}, failed: {}", report.sent, report.failed);
    Ok(())
}

fn execute_status(args: StatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let conn = db::open_migrated(&args.db)?;
    let counts = OutboxRepo::counts(&conn)?;
    println!(
        "pending: {}, sent: {}, failed: {}",
        counts.pending, counts.sent, counts.failed
    );
    Ok(())
}
