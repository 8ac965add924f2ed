//! Categories owned by users, and the reference type transactions store.
//!
//! A transaction may point either at one of the owner's categories or at a
//! system default category (see [`default_categories`](crate::default_categories)).
//! The ledger only cares about the polarity (`is_expense`) of the resolved
//! category.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

/// Tagged reference to a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "id", rename_all = "snake_case")]
pub enum CategoryRef {
    User(Uuid),
    Default(Uuid),
}

impl CategoryRef {
    pub(crate) const USER: &'static str = "user";
    pub(crate) const DEFAULT: &'static str = "default";

    #[must_use]
    pub fn id(self) -> Uuid {
        match self {
            Self::User(id) | Self::Default(id) => id,
        }
    }

    pub(crate) fn source_str(self) -> &'static str {
        match self {
            Self::User(_) => Self::USER,
            Self::Default(_) => Self::DEFAULT,
        }
    }

    pub(crate) fn from_parts(source: &str, id: &str) -> ResultEngine<Self> {
        let id = parse_uuid(id, "category")?;
        match source {
            Self::USER => Ok(Self::User(id)),
            Self::DEFAULT => Ok(Self::Default(id)),
            other => Err(EngineError::Validation(format!(
                "invalid category source: {other}"
            ))),
        }
    }
}

/// A category as seen by callers, regardless of where it is stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub reference: CategoryRef,
    pub name: String,
    pub is_expense: bool,
    pub parent: Option<Uuid>,
}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            reference: CategoryRef::User(parse_uuid(&model.id, "category")?),
            name: model.name,
            is_expense: model.is_expense,
            parent: model
                .parent_id
                .as_deref()
                .map(|raw| parse_uuid(raw, "category"))
                .transpose()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner: String,
    pub name: String,
    pub name_norm: String,
    pub is_expense: bool,
    pub parent_id: Option<String>,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::Owner",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_round_trips_through_storage_parts() {
        let id = Uuid::new_v4();
        for reference in [CategoryRef::User(id), CategoryRef::Default(id)] {
            let parsed =
                CategoryRef::from_parts(reference.source_str(), &reference.id().to_string())
                    .unwrap();
            assert_eq!(parsed, reference);
        }
        assert!(CategoryRef::from_parts("system", &id.to_string()).is_err());
    }

    #[test]
    fn reference_serializes_tagged() {
        let id = Uuid::nil();
        let json = serde_json::to_value(CategoryRef::Default(id)).unwrap();
        assert_eq!(json["source"], "default");
        assert_eq!(json["id"], id.to_string());
    }
}
