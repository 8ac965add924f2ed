use std::{future::Future, time::Duration};

use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::warn;

use crate::{Account, ResultEngine, Transaction};

mod access;
mod accounts;
mod balances;
mod categories;
mod transactions;
mod users;

pub use balances::BalanceCheck;
pub use transactions::TransactionListFilter;

/// Attempts made for an operation that keeps losing the race on an account row.
const MAX_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// `?` inside the block returns early and drops the DB transaction, which
/// rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Re-runs `run` while it fails with a retryable conflict, with a linear
/// backoff between attempts. Every attempt is a fresh atomic unit.
async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut run: F) -> ResultEngine<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ResultEngine<T>>,
{
    let mut attempt = 1;
    loop {
        match run().await {
            Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                warn!(operation, attempt, error = %err, "write conflict, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// What a committed create or update returns.
///
/// For a transfer `transaction` is the addressed leg (the source leg on
/// create) and `counterpart` the other one. `accounts` holds the post-commit
/// state of every account touched by the write, ordered by id. An update that
/// moves a row to another account lists both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub transaction: Transaction,
    pub counterpart: Option<Transaction>,
    pub accounts: Vec<Account>,
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn conflicts_are_retried_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_on_conflict("test", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(EngineError::Conflict("busy".to_string()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn conflicts_surface_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: ResultEngine<()> = retry_on_conflict("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::Conflict("busy".to_string()))
        })
        .await;
        assert_eq!(result, Err(EngineError::Conflict("busy".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn deterministic_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: ResultEngine<()> = retry_on_conflict("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::InsufficientFunds("no".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
