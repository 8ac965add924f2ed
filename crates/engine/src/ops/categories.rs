use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Category, EngineError, ResultEngine, categories, default_categories,
    util::{normalize_name_key, normalize_required_name},
};

use super::{Engine, with_tx};

/// Maximum number of levels in a category tree, the root included.
const MAX_CATEGORY_DEPTH: usize = 5;

impl Engine {
    /// Number of levels from `parent` up to its root, `parent` included.
    async fn category_depth(
        &self,
        db: &DatabaseTransaction,
        parent: &categories::Model,
    ) -> ResultEngine<usize> {
        let mut depth = 1;
        let mut next = parent.parent_id.clone();
        while let Some(id) = next {
            if depth >= MAX_CATEGORY_DEPTH {
                break;
            }
            let model = categories::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
            depth += 1;
            next = model.parent_id;
        }
        Ok(depth)
    }

    /// Creates a user category, optionally nested under one of the owner's
    /// categories.
    pub async fn new_category(
        &self,
        owner: &str,
        name: &str,
        is_expense: bool,
        parent: Option<Uuid>,
    ) -> ResultEngine<Category> {
        let name = normalize_required_name(name, "category")?;
        let name_norm = normalize_name_key(&name);
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, owner).await?;
            let duplicate = categories::Entity::find()
                .filter(categories::Column::Owner.eq(owner.to_string()))
                .filter(categories::Column::NameNorm.eq(name_norm.clone()))
                .one(&db_tx)
                .await?;
            if duplicate.is_some() {
                return Err(EngineError::ExistingKey(name));
            }

            if let Some(parent_id) = parent {
                let parent_model = self
                    .require_user_category(&db_tx, parent_id, owner)
                    .await?;
                if self.category_depth(&db_tx, &parent_model).await? >= MAX_CATEGORY_DEPTH {
                    return Err(EngineError::Validation(format!(
                        "category hierarchy is too deep (max {MAX_CATEGORY_DEPTH} levels)"
                    )));
                }
            }

            let model = categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                owner: ActiveValue::Set(owner.to_string()),
                name: ActiveValue::Set(name.clone()),
                name_norm: ActiveValue::Set(name_norm.clone()),
                is_expense: ActiveValue::Set(is_expense),
                parent_id: ActiveValue::Set(parent.map(|id| id.to_string())),
                active: ActiveValue::Set(true),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            Category::try_from(model)
        })
    }

    /// Active categories of `owner`, ordered by name.
    pub async fn categories(&self, owner: &str) -> ResultEngine<Vec<Category>> {
        with_tx!(self, |db_tx| {
            let models = categories::Entity::find()
                .filter(categories::Column::Owner.eq(owner.to_string()))
                .filter(categories::Column::Active.eq(true))
                .order_by_asc(categories::Column::NameNorm)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Category::try_from).collect()
        })
    }

    /// System categories, expenses first.
    pub async fn default_categories(&self) -> ResultEngine<Vec<Category>> {
        with_tx!(self, |db_tx| {
            let models = default_categories::Entity::find()
                .filter(default_categories::Column::Active.eq(true))
                .order_by_asc(default_categories::Column::Position)
                .order_by_asc(default_categories::Column::Name)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Category::try_from).collect()
        })
    }

    /// Looks up a system category by its exact name.
    pub async fn default_category(&self, name: &str) -> ResultEngine<Category> {
        with_tx!(self, |db_tx| {
            let model = default_categories::Entity::find()
                .filter(default_categories::Column::Name.eq(name.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("category {name} not exists")))?;
            Category::try_from(model)
        })
    }
}
