//! Command structs for engine operations.
//!
//! These types group parameters for write operations (create / update of
//! transactions, account opening), keeping call sites readable and avoiding
//! long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AccountKind, CategoryRef, Currency, Direction, Money, TransactionKind, TransactionStatus};

/// Record a new transaction.
///
/// `direction` is only meaningful for adjustments and
/// `destination_account_id` only for transfers; the ledger rejects them on any
/// other kind.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub owner: String,
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Money,
    pub category: CategoryRef,
    pub notes: Option<String>,
    pub status: TransactionStatus,
    pub occurred_at: DateTime<Utc>,
    pub direction: Option<Direction>,
    pub destination_account_id: Option<Uuid>,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(
        owner: impl Into<String>,
        account_id: Uuid,
        kind: TransactionKind,
        amount: Money,
        category: CategoryRef,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            owner: owner.into(),
            account_id,
            kind,
            amount,
            category,
            notes: None,
            status: TransactionStatus::default(),
            occurred_at,
            direction: None,
            destination_account_id: None,
        }
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    #[must_use]
    pub fn destination(mut self, account_id: Uuid) -> Self {
        self.destination_account_id = Some(account_id);
        self
    }
}

/// Patch an existing transaction. Fields left as `None` keep their value.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub owner: String,
    pub transaction_id: Uuid,
    pub amount: Option<Money>,
    pub account_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub direction: Option<Direction>,
    pub status: Option<TransactionStatus>,
    pub category: Option<CategoryRef>,
    pub notes: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(owner: impl Into<String>, transaction_id: Uuid) -> Self {
        Self {
            owner: owner.into(),
            transaction_id,
            amount: None,
            account_id: None,
            kind: None,
            direction: None,
            status: None,
            category: None,
            notes: None,
            occurred_at: None,
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    #[must_use]
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn category(mut self, category: CategoryRef) -> Self {
        self.category = Some(category);
        self
    }

    /// Replaces the notes. An empty string clears them.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.account_id.is_none()
            && self.kind.is_none()
            && self.direction.is_none()
            && self.status.is_none()
            && self.category.is_none()
            && self.notes.is_none()
            && self.occurred_at.is_none()
    }
}

/// Open a new account.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub owner: String,
    pub name: String,
    pub kind: AccountKind,
    pub currency: Currency,
    pub initial_balance: Money,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            kind,
            currency: Currency::default(),
            initial_balance: Money::ZERO,
        }
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn initial_balance(mut self, initial_balance: Money) -> Self {
        self.initial_balance = initial_balance;
        self
    }
}
