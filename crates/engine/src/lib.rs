//! Balance-consistency ledger.
//!
//! Accounts carry a cached balance that always equals their initial balance
//! plus the effect of every active, settled transaction recorded against
//! them. [`Engine`] is the only writer of that cache: every create, update
//! and soft delete of a transaction (or transfer pair) is one database
//! transaction that writes the rows and the balances together, or nothing.

pub use accounts::{Account, AccountKind};
pub use categories::{Category, CategoryRef};
pub use commands::{CreateTransactionCmd, NewAccountCmd, UpdateTransactionCmd};
pub use currency::Currency;
pub use error::{EngineError, ErrorKind};
pub use money::Money;
pub use ops::{BalanceCheck, Engine, EngineBuilder, TransactionListFilter, TransactionReceipt};
pub use transactions::{Direction, Transaction, TransactionKind, TransactionStatus};

pub mod bootstrap;
pub mod policy;

mod accounts;
mod categories;
mod commands;
mod currency;
mod default_categories;
mod error;
mod money;
mod ops;
mod transactions;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
