use chrono::Utc;
use sea_orm::TransactionTrait;
use tracing::info;
use uuid::Uuid;

use crate::{ResultEngine, Transaction, TransactionKind, TransactionStatus};

use super::super::super::{Engine, balances::BalancePlan, retry_on_conflict, with_tx};
use super::plan_row_change;

impl Engine {
    /// Soft deletes a transaction (and its partner leg for a transfer).
    ///
    /// Rows are kept with `status = Void` and `deleted_at` set; their balance
    /// effect is reversed. Deleting an already void transaction is a no-op.
    pub async fn delete_transaction(&self, owner: &str, transaction_id: Uuid) -> ResultEngine<()> {
        retry_on_conflict("delete_transaction", move || {
            self.delete_transaction_once(owner, transaction_id)
        })
        .await
    }

    async fn delete_transaction_once(&self, owner: &str, transaction_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, transaction_id, owner)
                .await?;
            let current = Transaction::try_from(model)?;
            if !current.is_active() || current.status == TransactionStatus::Void {
                return Ok(());
            }

            let legs: Vec<Transaction> = if current.kind == TransactionKind::Transfer {
                let pair = self.load_transfer_pair(&db_tx, current).await?;
                vec![pair.source, pair.destination]
            } else {
                vec![current]
            };

            let now = Utc::now();
            let mut plan = BalancePlan::new();
            let mut voided = Vec::with_capacity(legs.len());
            for leg in &legs {
                let mut void = leg.clone();
                void.status = TransactionStatus::Void;
                void.deleted_at = Some(now);
                void.updated_at = now;
                plan_row_change(&mut plan, Some(leg), Some(&void))?;
                voided.push(void);
            }

            self.apply_balance_plan(&db_tx, &plan, now).await?;
            for void in &voided {
                self.write_transaction(&db_tx, void).await?;
            }
            info!(
                %transaction_id,
                legs = voided.len(),
                "transaction deleted"
            );
            Ok(())
        })
    }
}
