//! The module contains `Account` struct and its storage model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, Money, ResultEngine,
    util::{normalize_name_key, parse_uuid},
};

/// Where money is kept. The kind decides the sign policy of the balance, see
/// [`policy::admissible`](crate::policy::admissible).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Bank,
    Cash,
    /// Credit card. Balance is `<= 0`, a negative balance is debt owed.
    Card,
    Other,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bank" => Ok(Self::Bank),
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "other" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

/// An account.
///
/// `balance` is a cache of `initial_balance` plus the deltas of every active,
/// cleared or reconciled transaction recorded against the account. Only the
/// ledger writes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub kind: AccountKind,
    pub currency: Currency,
    pub balance: Money,
    pub initial_balance: Money,
    pub active: bool,
    /// Optimistic concurrency counter, bumped on every balance write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub last_transaction_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(
        owner: String,
        name: String,
        kind: AccountKind,
        currency: Currency,
        initial_balance: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            name,
            kind,
            currency,
            balance: initial_balance,
            initial_balance,
            active: true,
            version: 0,
            created_at,
            deleted_at: None,
            last_transaction_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner: String,
    pub name: String,
    /// Case-folded `name`, the key of the per-owner uniqueness check.
    pub name_norm: String,
    pub kind: String,
    pub currency: String,
    pub balance_minor: i64,
    pub initial_balance_minor: i64,
    pub active: bool,
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub last_transaction_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::Owner",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            owner: ActiveValue::Set(value.owner.clone()),
            name: ActiveValue::Set(value.name.clone()),
            name_norm: ActiveValue::Set(normalize_name_key(&value.name)),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            balance_minor: ActiveValue::Set(value.balance.cents()),
            initial_balance_minor: ActiveValue::Set(value.initial_balance.cents()),
            active: ActiveValue::Set(value.active),
            version: ActiveValue::Set(value.version),
            created_at: ActiveValue::Set(value.created_at),
            deleted_at: ActiveValue::Set(value.deleted_at),
            last_transaction_at: ActiveValue::Set(value.last_transaction_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            owner: model.owner,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str())?,
            currency: Currency::try_from(model.currency.as_str())?,
            balance: Money::new(model.balance_minor),
            initial_balance: Money::new(model.initial_balance_minor),
            active: model.active,
            version: model.version,
            created_at: model.created_at,
            deleted_at: model.deleted_at,
            last_transaction_at: model.last_transaction_at,
        })
    }
}
