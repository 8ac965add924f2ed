//! The module contains the errors the engine can throw.
//!
//! Every variant maps onto one [`ErrorKind`], which is what the outer API
//! layer is expected to match on:
//!
//! - [`KeyNotFound`] when an id does not resolve.
//! - [`Forbidden`] when the entity belongs to another owner.
//! - [`InsufficientFunds`] / [`PositiveCardBalance`] when a projected balance
//!   is not admissible for the account kind.
//! - [`BrokenTransferPair`] when a transfer leg lost its partner. This is a
//!   data integrity failure and is never retried.
//! - [`Conflict`] when a concurrent writer won the race on an account row.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`PositiveCardBalance`]: EngineError::PositiveCardBalance
//!  [`BrokenTransferPair`]: EngineError::BrokenTransferPair
//!  [`Conflict`]: EngineError::Conflict
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Same account: {0}")]
    SameAccount(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Positive card balance: {0}")]
    PositiveCardBalance(String),
    #[error("Immutable transfer field: {0}")]
    ImmutableTransferField(String),
    #[error("Broken transfer pair: {0}")]
    BrokenTransferPair(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(DbErr),
}

/// Coarse error classification exposed to the API boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Validation,
    InsufficientFunds,
    PositiveCardBalance,
    ImmutableTransferField,
    BrokenTransferPair,
    Conflict,
    Internal,
}

impl EngineError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Validation(_)
            | Self::InvalidAmount(_)
            | Self::InvalidId(_)
            | Self::SameAccount(_)
            | Self::CurrencyMismatch(_)
            | Self::ExistingKey(_) => ErrorKind::Validation,
            Self::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            Self::PositiveCardBalance(_) => ErrorKind::PositiveCardBalance,
            Self::ImmutableTransferField(_) => ErrorKind::ImmutableTransferField,
            Self::BrokenTransferPair(_) => ErrorKind::BrokenTransferPair,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Only contention is worth retrying; everything else is deterministic.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// SQLite reports writer contention as "database is locked"/"busy", Postgres
/// as a serialization or deadlock failure.
fn is_contention(err: &DbErr) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("could not serialize access")
        || message.contains("deadlock detected")
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        if is_contention(&err) {
            Self::Conflict(err.to_string())
        } else {
            Self::Database(err)
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::SameAccount(a), Self::SameAccount(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::PositiveCardBalance(a), Self::PositiveCardBalance(b)) => a == b,
            (Self::ImmutableTransferField(a), Self::ImmutableTransferField(b)) => a == b,
            (Self::BrokenTransferPair(a), Self::BrokenTransferPair(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_database_is_a_conflict() {
        let err: EngineError = DbErr::Custom("error returned from database: (code: 5) database is locked".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.is_retryable());
    }

    #[test]
    fn other_database_errors_are_internal() {
        let err: EngineError = DbErr::Custom("no such table: accounts".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.is_retryable());
    }

    #[test]
    fn validation_family_collapses_to_one_kind() {
        for err in [
            EngineError::InvalidAmount("x".to_string()),
            EngineError::SameAccount("x".to_string()),
            EngineError::CurrencyMismatch("x".to_string()),
            EngineError::Validation("x".to_string()),
        ] {
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(
            EngineError::BrokenTransferPair("x".to_string()).kind(),
            ErrorKind::BrokenTransferPair
        );
    }
}
