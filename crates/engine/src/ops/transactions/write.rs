use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};

use crate::{EngineError, Money, ResultEngine, Transaction, policy, transactions};

use super::super::{Engine, balances::BalancePlan};

mod create;
mod delete;
mod update;

/// Balance effect of a stored row given its current status.
fn applied_delta(tx: &Transaction) -> Money {
    if tx.is_active() {
        policy::effective_delta(tx.kind, tx.direction, tx.status, tx.amount)
    } else {
        Money::ZERO
    }
}

/// Records in `plan` the move from `before` to `after` for one row.
///
/// The old effect is reversed on the old account and the new one applied on
/// the new account; the plan nets both when the account is unchanged.
fn plan_row_change(
    plan: &mut BalancePlan,
    before: Option<&Transaction>,
    after: Option<&Transaction>,
) -> ResultEngine<()> {
    if let Some(before) = before {
        plan.add(before.account_id, -applied_delta(before))?;
    }
    if let Some(after) = after {
        plan.add(after.account_id, applied_delta(after))?;
    }
    Ok(())
}

impl Engine {
    async fn insert_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        transactions::ActiveModel::from(tx).insert(db_tx).await?;
        Ok(())
    }

    /// Overwrites a stored row, provided nobody soft deleted it meanwhile.
    async fn write_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        let result = transactions::Entity::update_many()
            .set(transactions::ActiveModel::from(tx))
            .filter(transactions::Column::Id.eq(tx.id.to_string()))
            .filter(transactions::Column::DeletedAt.is_null())
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::Conflict(format!(
                "transaction {} was deleted concurrently",
                tx.id
            )));
        }
        Ok(())
    }
}
