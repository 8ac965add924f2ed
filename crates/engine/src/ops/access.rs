use sea_orm::{DatabaseTransaction, prelude::*};
use uuid::Uuid;

use crate::{
    Category, CategoryRef, EngineError, ResultEngine, TransactionKind, accounts, categories,
    default_categories, transactions, users,
};

use super::Engine;

/// Generates a `require_*` lookup for an entity owned by a user.
///
/// A missing row is `KeyNotFound`, a row owned by somebody else is
/// `Forbidden`.
macro_rules! impl_require_owned {
    ($require_fn:ident, $entity:path, $model:ty, $label:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            id: Uuid,
            owner: &str,
        ) -> ResultEngine<$model> {
            let model = <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(concat!($label, " not exists").to_string()))?;
            if model.owner != owner {
                return Err(EngineError::Forbidden(
                    concat!($label, " belongs to another user").to_string(),
                ));
            }
            Ok(model)
        }
    };
}

impl Engine {
    impl_require_owned!(
        require_account,
        accounts::Entity,
        accounts::Model,
        "account"
    );

    impl_require_owned!(
        require_transaction,
        transactions::Entity,
        transactions::Model,
        "transaction"
    );

    impl_require_owned!(
        require_user_category,
        categories::Entity,
        categories::Model,
        "category"
    );

    /// Like [`Self::require_account`], but the account must still accept
    /// transactions.
    pub(super) async fn require_active_account(
        &self,
        db: &DatabaseTransaction,
        id: Uuid,
        owner: &str,
    ) -> ResultEngine<accounts::Model> {
        let model = self.require_account(db, id, owner).await?;
        if !model.active || model.deleted_at.is_some() {
            return Err(EngineError::Validation(format!(
                "account '{}' is inactive",
                model.name
            )));
        }
        Ok(model)
    }

    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<()> {
        let exists = users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        Ok(())
    }

    /// Resolves a category reference for `owner`. Inactive categories cannot
    /// be assigned.
    pub(super) async fn resolve_category(
        &self,
        db: &DatabaseTransaction,
        reference: CategoryRef,
        owner: &str,
    ) -> ResultEngine<Category> {
        match reference {
            CategoryRef::User(id) => {
                let model = self.require_user_category(db, id, owner).await?;
                if !model.active {
                    return Err(EngineError::Validation(format!(
                        "category '{}' is inactive",
                        model.name
                    )));
                }
                Category::try_from(model)
            }
            CategoryRef::Default(id) => {
                let model = default_categories::Entity::find_by_id(id.to_string())
                    .one(db)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
                if !model.active {
                    return Err(EngineError::Validation(format!(
                        "category '{}' is inactive",
                        model.name
                    )));
                }
                Category::try_from(model)
            }
        }
    }
}

/// Expenses need an expense category and incomes an income category.
/// Transfers and adjustments accept either.
pub(super) fn check_category_polarity(
    kind: TransactionKind,
    category: &Category,
) -> ResultEngine<()> {
    match kind {
        TransactionKind::Expense if !category.is_expense => Err(EngineError::Validation(
            format!("category '{}' is not an expense category", category.name),
        )),
        TransactionKind::Income if category.is_expense => Err(EngineError::Validation(format!(
            "category '{}' is not an income category",
            category.name
        ))),
        _ => Ok(()),
    }
}
