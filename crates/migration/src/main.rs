use clap::{Parser, ValueEnum};
use sea_orm::Database;
use sea_orm_migration::prelude::*;

/// Applies or rolls back the ledger schema.
#[derive(Parser, Debug)]
#[command(name = "migration", version)]
struct Cli {
    #[arg(value_enum, default_value_t = Command::Up)]
    command: Command,

    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./ledgerkeep.db?mode=rwc"
    )]
    database_url: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Command {
    /// Apply every pending migration.
    Up,
    /// Roll back the last applied migration.
    Down,
    /// Drop every table, then apply all migrations.
    Fresh,
    /// Roll back every migration, then apply them again.
    Refresh,
    /// Print applied and pending migrations.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let db = Database::connect(&cli.database_url).await?;

    match cli.command {
        Command::Up => migration::Migrator::up(&db, None).await?,
        Command::Down => migration::Migrator::down(&db, Some(1)).await?,
        Command::Fresh => migration::Migrator::fresh(&db).await?,
        Command::Refresh => migration::Migrator::refresh(&db).await?,
        Command::Status => migration::Migrator::status(&db).await?,
    }

    Ok(())
}
