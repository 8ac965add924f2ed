//! Explicit process bootstrap.
//!
//! System categories are seeded by calling [`seed_default_categories`] once
//! the schema is migrated. Nothing in the engine seeds data implicitly.

use sea_orm::{ActiveValue, DatabaseConnection, QueryFilter, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{ResultEngine, default_categories};

const EXPENSE_CATEGORIES: [&str; 10] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Healthcare",
    "Education",
    "Travel",
    "Personal Care",
    "Other Expenses",
];

const INCOME_CATEGORIES: [&str; 5] = ["Salary", "Freelance", "Investment", "Gift", "Other Income"];

/// Income positions are offset so they sort after every expense category.
const INCOME_POSITION_OFFSET: i32 = 100;

/// `(name, is_expense, position)` for every system category.
fn default_category_specs() -> impl Iterator<Item = (&'static str, bool, i32)> {
    let expenses = (1..).zip(EXPENSE_CATEGORIES).map(|(pos, name)| (name, true, pos));
    let incomes = (1..)
        .zip(INCOME_CATEGORIES)
        .map(|(pos, name)| (name, false, pos + INCOME_POSITION_OFFSET));
    expenses.chain(incomes)
}

/// Inserts the system categories that are not present yet.
///
/// Idempotent: existing rows (matched by name) are left untouched. Returns the
/// number of rows inserted.
pub async fn seed_default_categories(db: &DatabaseConnection) -> ResultEngine<usize> {
    let db_tx = db.begin().await?;
    let mut inserted = 0;
    for (name, is_expense, position) in default_category_specs() {
        let exists = default_categories::Entity::find()
            .filter(default_categories::Column::Name.eq(name))
            .one(&db_tx)
            .await?
            .is_some();
        if exists {
            continue;
        }
        default_categories::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            name: ActiveValue::Set(name.to_string()),
            is_expense: ActiveValue::Set(is_expense),
            position: ActiveValue::Set(position),
            active: ActiveValue::Set(true),
        }
        .insert(&db_tx)
        .await?;
        inserted += 1;
    }
    db_tx.commit().await?;

    if inserted > 0 {
        info!(inserted, "default categories seeded");
    }
    Ok(inserted)
}
