//! System categories shared by every user.
//!
//! Rows are created by [`bootstrap::seed_default_categories`](crate::bootstrap::seed_default_categories)
//! and are read-only afterwards.

use sea_orm::entity::prelude::*;

use crate::{Category, CategoryRef, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "default_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub name: String,
    pub is_expense: bool,
    pub position: i32,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            reference: CategoryRef::Default(parse_uuid(&model.id, "default category")?),
            name: model.name,
            is_expense: model.is_expense,
            parent: None,
        })
    }
}
