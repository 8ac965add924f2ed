use chrono::Utc;
use clap::Parser;
use engine::{
    CategoryRef, CreateTransactionCmd, Engine, EngineError, NewAccountCmd, TransactionListFilter,
    UpdateTransactionCmd,
};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{
    AccountCommand, CategoryArg, CategoryCommand, Cli, Command, TxCommand, UserCommand,
};

mod cli;
mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Serialize)]
struct ErrorBody {
    kind: engine::ErrorKind,
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ledgerkeep={level},engine={level}",
            level = settings.app.level
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    tracing::debug!(%url, "connecting to database");
    let db = sea_orm::Database::connect(&url).await?;
    Migrator::up(&db, None).await?;
    engine::bootstrap::seed_default_categories(&db).await?;

    let engine = Engine::builder().database(db).build().await?;

    match run(&engine, cli.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            tracing::debug!(error = %err, "command failed");
            let body = ErrorBody {
                kind: error_kind(err.as_ref()),
                message: err.to_string(),
            };
            eprintln!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(1);
        }
    }
}

async fn run(engine: &Engine, command: Command) -> Result<serde_json::Value, BoxError> {
    match command {
        Command::Bootstrap => json(engine.default_categories().await?),
        Command::User(user) => match user.command {
            UserCommand::Create { username } => {
                engine.new_user(&username).await?;
                Ok(serde_json::json!({ "username": username }))
            }
        },
        Command::Account(account) => run_account(engine, account.command).await,
        Command::Category(category) => match category.command {
            CategoryCommand::Create {
                owner,
                name,
                income,
                parent,
            } => json(engine.new_category(&owner, &name, !income, parent).await?),
            CategoryCommand::List { owner } => {
                let mut categories = engine.categories(&owner).await?;
                categories.extend(engine.default_categories().await?);
                json(categories)
            }
        },
        Command::Tx(tx) => run_tx(engine, tx.command).await,
        Command::Reconcile(args) => {
            if let Some(account_id) = args.account {
                json(engine.verify_account(account_id, &args.owner).await?)
            } else if args.repair {
                json(engine.recompute_balances(&args.owner).await?)
            } else {
                json(engine.verify_balances(&args.owner).await?)
            }
        }
    }
}

async fn run_account(
    engine: &Engine,
    command: AccountCommand,
) -> Result<serde_json::Value, BoxError> {
    match command {
        AccountCommand::Create(args) => {
            let cmd = NewAccountCmd::new(args.owner, args.name, args.kind)
                .currency(args.currency)
                .initial_balance(args.initial_balance);
            json(engine.new_account(cmd).await?)
        }
        AccountCommand::Show { owner, id } => json(engine.account(id, &owner).await?),
        AccountCommand::List { owner, all } => json(engine.list_accounts(&owner, all).await?),
        AccountCommand::Rename { owner, id, name } => {
            json(engine.rename_account(id, &owner, &name).await?)
        }
        AccountCommand::Delete { owner, id } => {
            engine.delete_account(id, &owner).await?;
            Ok(serde_json::json!({ "deleted": id }))
        }
    }
}

async fn run_tx(engine: &Engine, command: TxCommand) -> Result<serde_json::Value, BoxError> {
    match command {
        TxCommand::Create(args) => {
            let category = resolve_category(engine, args.category).await?;
            let occurred_at = args.occurred_at.unwrap_or_else(Utc::now);
            let mut cmd = CreateTransactionCmd::new(
                args.owner,
                args.account,
                args.kind,
                args.amount,
                category,
                occurred_at,
            )
            .status(args.status);
            if let Some(notes) = args.notes {
                cmd = cmd.notes(notes);
            }
            if let Some(direction) = args.direction {
                cmd = cmd.direction(direction);
            }
            if let Some(destination) = args.to {
                cmd = cmd.destination(destination);
            }
            json(engine.create_transaction(cmd).await?)
        }
        TxCommand::Update(args) => {
            let mut cmd = UpdateTransactionCmd::new(args.owner, args.id);
            if let Some(amount) = args.amount {
                cmd = cmd.amount(amount);
            }
            if let Some(account_id) = args.account {
                cmd = cmd.account_id(account_id);
            }
            if let Some(kind) = args.kind {
                cmd = cmd.kind(kind);
            }
            if let Some(direction) = args.direction {
                cmd = cmd.direction(direction);
            }
            if let Some(status) = args.status {
                cmd = cmd.status(status);
            }
            if let Some(category) = args.category {
                cmd = cmd.category(resolve_category(engine, category).await?);
            }
            if let Some(notes) = args.notes {
                cmd = cmd.notes(notes);
            }
            if let Some(occurred_at) = args.occurred_at {
                cmd = cmd.occurred_at(occurred_at);
            }
            json(engine.update_transaction(cmd).await?)
        }
        TxCommand::Delete { owner, id } => {
            engine.delete_transaction(&owner, id).await?;
            Ok(serde_json::json!({ "deleted": id }))
        }
        TxCommand::List(args) => {
            let category = match args.category {
                Some(category) => Some(resolve_category(engine, category).await?),
                None => None,
            };
            let filter = TransactionListFilter {
                account_id: args.account,
                kinds: (!args.kinds.is_empty()).then_some(args.kinds),
                category,
                status: args.status,
                from: args.from,
                to: args.to,
                search: args.search,
                include_deleted: args.include_deleted,
                limit: args.limit,
            };
            json(engine.list_transactions(&args.owner, &filter).await?)
        }
    }
}

async fn resolve_category(engine: &Engine, arg: CategoryArg) -> Result<CategoryRef, EngineError> {
    Ok(match arg {
        CategoryArg::User(id) => CategoryRef::User(id),
        CategoryArg::DefaultId(id) => CategoryRef::Default(id),
        CategoryArg::DefaultName(name) => engine.default_category(&name).await?.reference,
    })
}

fn json<T: Serialize>(value: T) -> Result<serde_json::Value, BoxError> {
    Ok(serde_json::to_value(value)?)
}

/// Engine failures keep their kind, anything else is internal.
fn error_kind(err: &(dyn std::error::Error + Send + Sync + 'static)) -> engine::ErrorKind {
    err.downcast_ref::<EngineError>()
        .map_or(engine::ErrorKind::Internal, EngineError::kind)
}
