//! Database migration commands

use beatwatch_store::db;
use beatwatch_store::migrations::{applied_migrations, apply_migrations};
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct DbArgs {
    #[command(subcommand)]
    pub command: DbCommand,
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Apply pending migrations
    Migrate(DbPathArgs),
    /// List applied migrations
    Status(DbPathArgs),
}

#[derive(Debug, Args)]
pub struct DbPathArgs {
    #[arg(long, default_value = ".beatwatch/beatwatch.db")]
    pub db: String,
}

pub fn execute(args: DbArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        DbCommand::Migrate(a) => execute_migrate(a),
        DbCommand::Status(a) => execute_status(a),
    }
}

fn ensure_parent(path: &str) -> std::io::Result<()> {
    match std::path::Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

fn execute_migrate(args: DbPathArgs) -> Result<(), Box<dyn std::error::Error>> {
    ensure_parent(&args.db)?;
    let mut conn = db::open(&args.db)?;
    let applied = apply_migrations(&mut conn)?;

    if applied.is_empty() {
        println!("Schema up to date");
    } else {
        for id in &applied {
            println!("applied {}", id);
        }
        println!("{} migration(s) applied", applied.len());
    }
    Ok(())
}

fn execute_status(args: DbPathArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !std::path::Path::new(&args.db).exists() {
        return Err(format!("database not found: {}", args.db).into());
    }
    let conn = db::open(&args.db)?;
    let rows = applied_migrations(&conn)?;
    if rows.is_empty() {
        println!("No migrations applied");
    }
    for row in rows {
        println!("{}\t{}\t{}", row.migration_id, row.applied_at, row.checksum);
    }
    Ok(())
}
