use chrono::Utc;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use tracing::debug;

use crate::{
    Account, Direction, EngineError, ResultEngine, Transaction, TransactionKind,
    TransactionStatus, UpdateTransactionCmd, util::normalize_optional_text,
};

use super::super::super::{
    Engine, TransactionReceipt, access::check_category_polarity, balances::BalancePlan,
    retry_on_conflict, with_tx,
};
use super::plan_row_change;

/// Rejects updates that may never be applied, whatever the stored row is.
fn validate_update(cmd: &UpdateTransactionCmd) -> ResultEngine<()> {
    if cmd.amount.is_some_and(|amount| !amount.is_positive()) {
        return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
    }
    if cmd.status == Some(TransactionStatus::Void) {
        return Err(EngineError::Validation(
            "use delete to void a transaction".to_string(),
        ));
    }
    Ok(())
}

/// A transfer leg only accepts status, date, notes and category changes.
/// Re-sending an unchanged value is accepted.
fn ensure_transfer_fields_unchanged(
    current: &Transaction,
    cmd: &UpdateTransactionCmd,
) -> ResultEngine<()> {
    let immutable = |field: &str| {
        Err(EngineError::ImmutableTransferField(format!(
            "{field} of a transfer leg cannot be changed; delete and recreate the transfer"
        )))
    };
    if cmd.amount.is_some_and(|amount| amount != current.amount) {
        return immutable("amount");
    }
    if cmd.account_id.is_some_and(|id| id != current.account_id) {
        return immutable("account");
    }
    if cmd.kind.is_some_and(|kind| kind != current.kind) {
        return immutable("kind");
    }
    if cmd.direction.is_some_and(|direction| direction != current.direction) {
        return immutable("direction");
    }
    Ok(())
}

/// Direction of a non-transfer row after the update.
fn resolve_direction(
    current: &Transaction,
    kind: TransactionKind,
    requested: Option<Direction>,
) -> ResultEngine<Direction> {
    let fixed = match kind {
        TransactionKind::Expense => Direction::Outflow,
        TransactionKind::Income => Direction::Inflow,
        TransactionKind::Adjustment => {
            return requested
                .or((current.kind == TransactionKind::Adjustment).then_some(current.direction))
                .ok_or_else(|| {
                    EngineError::Validation("adjustments require a direction".to_string())
                });
        }
        TransactionKind::Transfer => {
            return Err(EngineError::Validation(
                "a transaction cannot be turned into a transfer".to_string(),
            ));
        }
    };
    if requested.is_some_and(|direction| direction != fixed) {
        return Err(EngineError::Validation(format!(
            "direction of {} transactions is fixed",
            kind.as_str()
        )));
    }
    Ok(fixed)
}

impl Engine {
    /// Updates a transaction, reversing its old balance effect and applying
    /// the new one in a single atomic unit.
    ///
    /// On a transfer leg a status change moves both legs and the date is
    /// mirrored on the partner; notes and category only change on the
    /// addressed leg.
    pub async fn update_transaction(
        &self,
        cmd: UpdateTransactionCmd,
    ) -> ResultEngine<TransactionReceipt> {
        validate_update(&cmd)?;
        let cmd = &cmd;
        retry_on_conflict("update_transaction", move || {
            self.update_transaction_once(cmd)
        })
        .await
    }

    async fn update_transaction_once(
        &self,
        cmd: &UpdateTransactionCmd,
    ) -> ResultEngine<TransactionReceipt> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, cmd.transaction_id, &cmd.owner)
                .await?;
            let current = Transaction::try_from(model)?;
            if !current.is_active() || current.status == TransactionStatus::Void {
                return Err(EngineError::Validation(
                    "a void transaction cannot be updated".to_string(),
                ));
            }

            if current.kind == TransactionKind::Transfer {
                self.update_transfer_leg(&db_tx, current, cmd).await
            } else {
                self.update_single(&db_tx, current, cmd).await
            }
        })
    }

    async fn update_single(
        &self,
        db_tx: &DatabaseTransaction,
        current: Transaction,
        cmd: &UpdateTransactionCmd,
    ) -> ResultEngine<TransactionReceipt> {
        if cmd.is_empty() {
            let accounts = self
                .accounts_snapshot(db_tx, [current.account_id])
                .await?;
            return Ok(TransactionReceipt {
                transaction: current,
                counterpart: None,
                accounts,
            });
        }

        let kind = cmd.kind.unwrap_or(current.kind);
        let direction = resolve_direction(&current, kind, cmd.direction)?;

        let account_id = cmd.account_id.unwrap_or(current.account_id);
        let mut reassigned = false;
        if account_id != current.account_id {
            let target = Account::try_from(
                self.require_active_account(db_tx, account_id, &cmd.owner)
                    .await?,
            )?;
            let origin =
                Account::try_from(self.require_account(db_tx, current.account_id, &cmd.owner).await?)?;
            if target.currency != origin.currency {
                return Err(EngineError::CurrencyMismatch(format!(
                    "cannot move a {} transaction to a {} account",
                    origin.currency, target.currency
                )));
            }
            reassigned = true;
        }

        let category = cmd.category.unwrap_or(current.category);
        if cmd.category.is_some() || kind != current.kind {
            let resolved = self.resolve_category(db_tx, category, &cmd.owner).await?;
            check_category_polarity(kind, &resolved)?;
        }

        let now = Utc::now();
        let mut updated = current.clone();
        updated.kind = kind;
        updated.direction = direction;
        updated.account_id = account_id;
        updated.category = category;
        if let Some(amount) = cmd.amount {
            updated.amount = amount;
        }
        if let Some(status) = cmd.status {
            updated.status = status;
        }
        if let Some(notes) = &cmd.notes {
            updated.notes = normalize_optional_text(Some(notes)).unwrap_or_default();
        }
        if let Some(occurred_at) = cmd.occurred_at {
            updated.occurred_at = occurred_at;
        }
        updated.updated_at = now;

        let mut plan = BalancePlan::new();
        plan_row_change(&mut plan, Some(&current), Some(&updated))?;
        if reassigned {
            plan.stamp(account_id);
        }
        self.apply_balance_plan(db_tx, &plan, now).await?;
        self.write_transaction(db_tx, &updated).await?;

        let accounts = self
            .accounts_snapshot(db_tx, [current.account_id, updated.account_id])
            .await?;
        debug!(
            transaction_id = %updated.id,
            old_delta = %super::applied_delta(&current),
            new_delta = %super::applied_delta(&updated),
            "transaction updated"
        );
        Ok(TransactionReceipt {
            transaction: updated,
            counterpart: None,
            accounts,
        })
    }

    async fn update_transfer_leg(
        &self,
        db_tx: &DatabaseTransaction,
        current: Transaction,
        cmd: &UpdateTransactionCmd,
    ) -> ResultEngine<TransactionReceipt> {
        ensure_transfer_fields_unchanged(&current, cmd)?;
        let addressed = current.id;
        let pair = self.load_transfer_pair(db_tx, current).await?;

        let (leg, partner) = if pair.source.id == addressed {
            (&pair.source, &pair.destination)
        } else {
            (&pair.destination, &pair.source)
        };

        if let Some(category) = cmd.category {
            let resolved = self.resolve_category(db_tx, category, &cmd.owner).await?;
            check_category_polarity(TransactionKind::Transfer, &resolved)?;
        }

        let now = Utc::now();
        let mut new_leg = leg.clone();
        let mut new_partner = partner.clone();
        if let Some(status) = cmd.status {
            new_leg.status = status;
            new_partner.status = status;
        }
        if let Some(occurred_at) = cmd.occurred_at {
            new_leg.occurred_at = occurred_at;
            new_partner.occurred_at = occurred_at;
        }
        if let Some(category) = cmd.category {
            new_leg.category = category;
        }
        if let Some(notes) = &cmd.notes {
            new_leg.notes = normalize_optional_text(Some(notes)).unwrap_or_default();
        }
        new_leg.updated_at = now;
        new_partner.updated_at = now;

        let mut plan = BalancePlan::new();
        plan_row_change(&mut plan, Some(leg), Some(&new_leg))?;
        plan_row_change(&mut plan, Some(partner), Some(&new_partner))?;
        self.apply_balance_plan(db_tx, &plan, now).await?;
        self.write_transaction(db_tx, &new_leg).await?;
        self.write_transaction(db_tx, &new_partner).await?;

        let accounts = self
            .accounts_snapshot(db_tx, [new_leg.account_id, new_partner.account_id])
            .await?;
        debug!(
            transaction_id = %new_leg.id,
            linked_transaction_id = %new_partner.id,
            status = new_leg.status.as_str(),
            "transfer updated"
        );
        Ok(TransactionReceipt {
            transaction: new_leg,
            counterpart: Some(new_partner),
            accounts,
        })
    }
}
