//! Transaction primitives.
//!
//! A `Transaction` is one money movement recorded against one account. Its
//! amount is an unsigned magnitude; the sign of its effect on the balance is
//! derived from `kind` and `direction` (see [`policy::delta`](crate::policy::delta)).
//! A transfer is stored as two rows, one per account, linked to each other.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CategoryRef, EngineError, Money, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Income,
    Transfer,
    Adjustment,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
            Self::Adjustment => "adjustment",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            "adjustment" | "adjust" => Ok(Self::Adjustment),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Cleared,
    Reconciled,
    Void,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Cleared => "cleared",
            Self::Reconciled => "reconciled",
            Self::Void => "void",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "cleared" => Ok(Self::Cleared),
            "reconciled" => Ok(Self::Reconciled),
            "void" => Ok(Self::Void),
            other => Err(EngineError::Validation(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

/// Economic direction of a row on its own account.
///
/// Fixed by the kind for expenses (`Outflow`) and incomes (`Inflow`). An
/// adjustment carries it explicitly. For a transfer it tells the source leg
/// (`Outflow`) from the destination leg (`Inflow`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inflow,
    Outflow,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inflow => "inflow",
            Self::Outflow => "outflow",
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "inflow" | "increase" => Ok(Self::Inflow),
            "outflow" | "decrease" => Ok(Self::Outflow),
            other => Err(EngineError::Validation(format!(
                "invalid direction: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner: String,
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub direction: Direction,
    pub status: TransactionStatus,
    pub category: CategoryRef,
    pub amount: Money,
    pub notes: String,
    pub occurred_at: DateTime<Utc>,
    pub linked_transaction: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Builds an unsaved row. The amount must be a strictly positive magnitude.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: String,
        account_id: Uuid,
        kind: TransactionKind,
        direction: Direction,
        status: TransactionStatus,
        category: CategoryRef,
        amount: Money,
        notes: String,
        occurred_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            owner,
            account_id,
            kind,
            direction,
            status,
            category,
            amount,
            notes,
            occurred_at,
            linked_transaction: None,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        })
    }

    /// A row is active until it is soft deleted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner: String,
    pub account_id: String,
    pub kind: String,
    pub direction: String,
    pub status: String,
    pub category_source: String,
    pub category_id: String,
    pub amount_minor: i64,
    pub notes: String,
    /// Lowercased `notes`, matched by the free-text search.
    pub notes_norm: String,
    pub occurred_at: DateTimeUtc,
    pub linked_transaction_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            owner: ActiveValue::Set(tx.owner.clone()),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            direction: ActiveValue::Set(tx.direction.as_str().to_string()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            category_source: ActiveValue::Set(tx.category.source_str().to_string()),
            category_id: ActiveValue::Set(tx.category.id().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            notes: ActiveValue::Set(tx.notes.clone()),
            notes_norm: ActiveValue::Set(tx.notes.to_lowercase()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            linked_transaction_id: ActiveValue::Set(
                tx.linked_transaction.map(|id| id.to_string()),
            ),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
            deleted_at: ActiveValue::Set(tx.deleted_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let amount = Money::new(model.amount_minor);
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "stored amount for transaction {} is not positive",
                model.id
            )));
        }
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            owner: model.owner,
            account_id: parse_uuid(&model.account_id, "account")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            direction: Direction::try_from(model.direction.as_str())?,
            status: TransactionStatus::try_from(model.status.as_str())?,
            category: CategoryRef::from_parts(&model.category_source, &model.category_id)?,
            amount,
            notes: model.notes,
            occurred_at: model.occurred_at,
            linked_transaction: model
                .linked_transaction_id
                .as_deref()
                .map(|raw| parse_uuid(raw, "linked transaction"))
                .transpose()?,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        })
    }
}
