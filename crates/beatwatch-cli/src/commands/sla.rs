//! SLA sweep and per-alert metrics

use std::path::Path;

use beatwatch_core::scope::Caller;
use beatwatch_core_types::RequestContext;
use beatwatch_engine::alerts::{alert_sla, sweep_sla_breaches};
use beatwatch_store::db;
use clap::{Args, Subcommand};

use super::load_context;

#[derive(Debug, Args)]
pub struct SlaArgs {
    #[command(subcommand)]
    pub command: SlaCommand,
}

#[derive(Debug, Subcommand)]
pub enum SlaCommand {
    /// Report every open breach
    Sweep(SweepArgs),
    /// Response and resolution times for one alert
    Alert(AlertArgs),
}

#[derive(Debug, Args)]
pub struct SweepArgs {
    #[arg(long, default_value = ".beatwatch/beatwatch.db")]
    pub db: String,

    /// Print breaches as a JSON array
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AlertArgs {
    pub alert_id: String,

    #[arg(long, default_value = ".beatwatch/beatwatch.db")]
    pub db: String,
}

pub fn execute(args: SlaArgs, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        SlaCommand::Sweep(a) => execute_sweep(a, config),
        SlaCommand::Alert(a) => execute_alert(a, config),
    }
}

fn execute_sweep(args: SweepArgs, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = load_context(config)?;
    let conn = db::open_migrated(&args.db)?;
    let breaches = sweep_sla_breaches(&ctx, &conn)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&breaches)?);
        return Ok(());
    }
    if breaches.is_empty() {
        println!("No open breaches");
    }
    for b in &breaches {
        println!(
            "{}\t{}\t{:?}\t{} min late",
            b.kind.as_str(),
            b.entity_id,
            b.severity,
            b.breach_minutes
        );
    }
    Ok(())
}

fn execute_alert(args: AlertArgs, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = load_context(config)?;
    let conn = db::open_migrated(&args.db)?;
    let caller = Caller::admin(RequestContext::system());
    let metrics = alert_sla(&ctx, &caller, &args.alert_id, &conn)?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
