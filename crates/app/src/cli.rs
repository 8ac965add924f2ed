//! Operator command line.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{
    AccountKind, Currency, Direction, Money, TransactionKind, TransactionStatus,
};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "ledgerkeep", version)]
#[command(about = "Balance-consistent ledger of accounts and transactions")]
pub struct Cli {
    /// Database connection string; overrides the `database` setting.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Migrate the schema, seed the system categories and list them.
    Bootstrap,
    User(User),
    Account(Account),
    Category(Category),
    Tx(Tx),
    /// Compare cached balances with the transaction history.
    Reconcile(ReconcileArgs),
}

#[derive(Args, Debug)]
pub struct User {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    Create {
        #[arg(long)]
        username: String,
    },
}

#[derive(Args, Debug)]
pub struct Account {
    #[command(subcommand)]
    pub command: AccountCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    Create(AccountCreateArgs),
    Show {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: Uuid,
    },
    List {
        #[arg(long)]
        owner: String,
        /// Include soft deleted accounts.
        #[arg(long)]
        all: bool,
    },
    Rename {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        name: String,
    },
    Delete {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct AccountCreateArgs {
    #[arg(long)]
    pub owner: String,
    #[arg(long)]
    pub name: String,
    #[arg(long, value_parser = parse_account_kind)]
    pub kind: AccountKind,
    #[arg(long, value_parser = parse_currency, default_value = "USD")]
    pub currency: Currency,
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub initial_balance: Money,
}

#[derive(Args, Debug)]
pub struct Category {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    Create {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: String,
        /// Create an income category instead of an expense one.
        #[arg(long)]
        income: bool,
        #[arg(long)]
        parent: Option<Uuid>,
    },
    /// List the owner's categories followed by the system ones.
    List {
        #[arg(long)]
        owner: String,
    },
}

/// `user:<uuid>`, `default:<uuid>` or `default:<name>`.
#[derive(Clone, Debug)]
pub enum CategoryArg {
    User(Uuid),
    DefaultId(Uuid),
    DefaultName(String),
}

#[derive(Args, Debug)]
pub struct Tx {
    #[command(subcommand)]
    pub command: TxCommand,
}

#[derive(Subcommand, Debug)]
pub enum TxCommand {
    Create(TxCreateArgs),
    Update(TxUpdateArgs),
    Delete {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: Uuid,
    },
    List(TxListArgs),
}

#[derive(Args, Debug)]
pub struct TxCreateArgs {
    #[arg(long)]
    pub owner: String,
    #[arg(long)]
    pub account: Uuid,
    #[arg(long, value_parser = parse_transaction_kind)]
    pub kind: TransactionKind,
    #[arg(long)]
    pub amount: Money,
    #[arg(long, value_parser = parse_category)]
    pub category: CategoryArg,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long, value_parser = parse_status, default_value = "cleared")]
    pub status: TransactionStatus,
    /// RFC 3339 timestamp, defaults to now.
    #[arg(long)]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Required for adjustments.
    #[arg(long, value_parser = parse_direction)]
    pub direction: Option<Direction>,
    /// Destination account, required for transfers.
    #[arg(long)]
    pub to: Option<Uuid>,
}

#[derive(Args, Debug)]
pub struct TxUpdateArgs {
    #[arg(long)]
    pub owner: String,
    #[arg(long)]
    pub id: Uuid,
    #[arg(long)]
    pub amount: Option<Money>,
    #[arg(long)]
    pub account: Option<Uuid>,
    #[arg(long, value_parser = parse_transaction_kind)]
    pub kind: Option<TransactionKind>,
    #[arg(long, value_parser = parse_direction)]
    pub direction: Option<Direction>,
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TransactionStatus>,
    #[arg(long, value_parser = parse_category)]
    pub category: Option<CategoryArg>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct TxListArgs {
    #[arg(long)]
    pub owner: String,
    #[arg(long)]
    pub account: Option<Uuid>,
    /// Repeat to allow several kinds.
    #[arg(long = "kind", value_parser = parse_transaction_kind)]
    pub kinds: Vec<TransactionKind>,
    #[arg(long, value_parser = parse_category)]
    pub category: Option<CategoryArg>,
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TransactionStatus>,
    /// Inclusive lower bound (RFC 3339).
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound (RFC 3339).
    #[arg(long)]
    pub to: Option<DateTime<Utc>>,
    /// Terms that must all appear in the notes.
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub include_deleted: bool,
    #[arg(long)]
    pub limit: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    #[arg(long)]
    pub owner: String,
    /// Check a single account.
    #[arg(long, conflicts_with = "repair")]
    pub account: Option<Uuid>,
    /// Rewrite drifted cached balances from history.
    #[arg(long)]
    pub repair: bool,
}

fn parse_account_kind(raw: &str) -> Result<AccountKind, String> {
    AccountKind::try_from(raw).map_err(|err| err.to_string())
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw).map_err(|err| err.to_string())
}

fn parse_transaction_kind(raw: &str) -> Result<TransactionKind, String> {
    TransactionKind::try_from(raw.to_ascii_lowercase().as_str()).map_err(|err| err.to_string())
}

fn parse_status(raw: &str) -> Result<TransactionStatus, String> {
    TransactionStatus::try_from(raw.to_ascii_lowercase().as_str()).map_err(|err| err.to_string())
}

fn parse_direction(raw: &str) -> Result<Direction, String> {
    Direction::try_from(raw.to_ascii_lowercase().as_str()).map_err(|err| err.to_string())
}

fn parse_category(raw: &str) -> Result<CategoryArg, String> {
    let (source, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected user:<id> or default:<id|name>, got {raw}"))?;
    match source {
        "user" => Uuid::parse_str(value)
            .map(CategoryArg::User)
            .map_err(|_| format!("invalid category id: {value}")),
        "default" => Ok(match Uuid::parse_str(value) {
            Ok(id) => CategoryArg::DefaultId(id),
            Err(_) => CategoryArg::DefaultName(value.to_string()),
        }),
        other => Err(format!("unknown category source: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn category_argument_forms() {
        assert!(matches!(
            parse_category("default:Food & Dining"),
            Ok(CategoryArg::DefaultName(name)) if name == "Food & Dining"
        ));
        let id = Uuid::new_v4();
        assert!(matches!(
            parse_category(&format!("user:{id}")),
            Ok(CategoryArg::User(parsed)) if parsed == id
        ));
        assert!(parse_category("user:not-a-uuid").is_err());
        assert!(parse_category("Salary").is_err());
    }

    #[test]
    fn transfer_command_parses() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "ledgerkeep",
            "tx",
            "create",
            "--owner",
            "alice",
            "--account",
            &from.to_string(),
            "--kind",
            "transfer",
            "--amount",
            "200.00",
            "--category",
            "default:Other Expenses",
            "--to",
            &to.to_string(),
        ])
        .unwrap();
        let Command::Tx(Tx {
            command: TxCommand::Create(args),
        }) = cli.command
        else {
            panic!("unexpected command");
        };
        assert_eq!(args.kind, TransactionKind::Transfer);
        assert_eq!(args.amount, Money::new(20_000));
        assert_eq!(args.status, TransactionStatus::Cleared);
        assert_eq!(args.to, Some(to));
    }
}
