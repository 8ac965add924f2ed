#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement, Value};

use engine::{
    Account, AccountKind, CategoryRef, CreateTransactionCmd, Engine, Money, NewAccountCmd,
    TransactionKind,
};
use migration::MigratorTrait;
use uuid::Uuid;

pub const OWNER: &str = "alice";
pub const OTHER_OWNER: &str = "bob";

async fn prepare(db: &DatabaseConnection) -> Engine {
    migration::Migrator::up(db, None).await.unwrap();
    engine::bootstrap::seed_default_categories(db).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    engine.new_user(OWNER).await.unwrap();
    engine.new_user(OTHER_OWNER).await.unwrap();
    engine
}

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let engine = prepare(&db).await;
    (engine, db)
}

/// File backed database, needed wherever real writer contention matters.
pub async fn engine_with_file_db() -> (Engine, DatabaseConnection, PathBuf) {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());
    let db = Database::connect(&url).await.unwrap();
    let engine = prepare(&db).await;
    (engine, db, path)
}

pub fn money(cents: i64) -> Money {
    Money::new(cents)
}

pub fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::days(i64::from(n))
}

pub async fn open_account(
    engine: &Engine,
    name: &str,
    kind: AccountKind,
    initial_cents: i64,
) -> Account {
    engine
        .new_account(NewAccountCmd::new(OWNER, name, kind).initial_balance(money(initial_cents)))
        .await
        .unwrap()
}

pub async fn default_category(engine: &Engine, name: &str) -> CategoryRef {
    engine.default_category(name).await.unwrap().reference
}

pub async fn food(engine: &Engine) -> CategoryRef {
    default_category(engine, "Food & Dining").await
}

pub async fn salary(engine: &Engine) -> CategoryRef {
    default_category(engine, "Salary").await
}

pub async fn balance(engine: &Engine, account_id: Uuid) -> Money {
    engine.account(account_id, OWNER).await.unwrap().balance
}

pub async fn expense_cmd(engine: &Engine, account_id: Uuid, cents: i64) -> CreateTransactionCmd {
    CreateTransactionCmd::new(
        OWNER,
        account_id,
        TransactionKind::Expense,
        money(cents),
        food(engine).await,
        day(0),
    )
}

pub async fn income_cmd(engine: &Engine, account_id: Uuid, cents: i64) -> CreateTransactionCmd {
    CreateTransactionCmd::new(
        OWNER,
        account_id,
        TransactionKind::Income,
        money(cents),
        salary(engine).await,
        day(0),
    )
}

pub async fn transfer_cmd(
    engine: &Engine,
    from: Uuid,
    to: Uuid,
    cents: i64,
) -> CreateTransactionCmd {
    CreateTransactionCmd::new(
        OWNER,
        from,
        TransactionKind::Transfer,
        money(cents),
        default_category(engine, "Other Expenses").await,
        day(0),
    )
    .destination(to)
}

/// Runs raw SQL behind the engine's back.
pub async fn tamper(db: &DatabaseConnection, sql: &str, values: Vec<Value>) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(backend, sql, values))
        .await
        .unwrap();
}

pub async fn assert_consistent(engine: &Engine) {
    for check in engine.verify_balances(OWNER).await.unwrap() {
        assert!(
            check.is_consistent(),
            "account {} cached {} expected {}",
            check.account_id,
            check.cached,
            check.expected
        );
    }
}
