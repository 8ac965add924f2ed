use chrono::Utc;
use sea_orm::TransactionTrait;
use tracing::info;

use crate::{
    Account, CreateTransactionCmd, Direction, EngineError, ResultEngine, Transaction,
    TransactionKind, TransactionStatus, util::normalize_optional_text,
};

use super::super::super::{
    Engine, TransactionReceipt, access::check_category_polarity, balances::BalancePlan,
    retry_on_conflict, with_tx,
};
use super::super::transfer::{TransferPair, TransferDraft};
use super::plan_row_change;

/// Checks the parts of a create request that need no storage access and
/// returns the direction of the (source) row.
fn validate_create(cmd: &CreateTransactionCmd) -> ResultEngine<Direction> {
    if !cmd.amount.is_positive() {
        return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
    }
    if cmd.status == TransactionStatus::Void {
        return Err(EngineError::Validation(
            "a transaction cannot be created void".to_string(),
        ));
    }
    match (cmd.kind, cmd.destination_account_id) {
        (TransactionKind::Transfer, None) => {
            return Err(EngineError::Validation(
                "destination account is required for transfers".to_string(),
            ));
        }
        (TransactionKind::Transfer, Some(destination)) if destination == cmd.account_id => {
            return Err(EngineError::SameAccount(
                "source and destination accounts must differ".to_string(),
            ));
        }
        (TransactionKind::Expense | TransactionKind::Income | TransactionKind::Adjustment, Some(_)) => {
            return Err(EngineError::Validation(
                "destination account is only allowed for transfers".to_string(),
            ));
        }
        _ => {}
    }
    match (cmd.kind, cmd.direction) {
        (TransactionKind::Adjustment, Some(direction)) => Ok(direction),
        (TransactionKind::Adjustment, None) => Err(EngineError::Validation(
            "adjustments require a direction".to_string(),
        )),
        (_, Some(_)) => Err(EngineError::Validation(
            "direction is only allowed for adjustments".to_string(),
        )),
        (TransactionKind::Expense, None) => Ok(Direction::Outflow),
        (TransactionKind::Income, None) => Ok(Direction::Inflow),
        (TransactionKind::Transfer, None) => Ok(Direction::Outflow),
    }
}

impl Engine {
    /// Records a new transaction and updates the affected balances.
    ///
    /// A transfer writes both legs. Every projected balance is checked before
    /// anything is committed; on failure nothing is written.
    pub async fn create_transaction(
        &self,
        cmd: CreateTransactionCmd,
    ) -> ResultEngine<TransactionReceipt> {
        let direction = validate_create(&cmd)?;
        let cmd = &cmd;
        retry_on_conflict("create_transaction", move || {
            self.create_transaction_once(cmd, direction)
        })
        .await
    }

    async fn create_transaction_once(
        &self,
        cmd: &CreateTransactionCmd,
        direction: Direction,
    ) -> ResultEngine<TransactionReceipt> {
        with_tx!(self, |db_tx| {
            let source_model = self
                .require_active_account(&db_tx, cmd.account_id, &cmd.owner)
                .await?;
            let source = Account::try_from(source_model)?;
            let category = self
                .resolve_category(&db_tx, cmd.category, &cmd.owner)
                .await?;
            check_category_polarity(cmd.kind, &category)?;

            let notes = normalize_optional_text(cmd.notes.as_deref()).unwrap_or_default();
            let now = Utc::now();
            let mut plan = BalancePlan::new();

            let (transaction, counterpart) = match cmd.destination_account_id {
                Some(destination_id) => {
                    let destination_model = self
                        .require_active_account(&db_tx, destination_id, &cmd.owner)
                        .await?;
                    let destination = Account::try_from(destination_model)?;
                    if destination.currency != source.currency {
                        return Err(EngineError::CurrencyMismatch(format!(
                            "cannot transfer from {} to {}",
                            source.currency, destination.currency
                        )));
                    }

                    let pair = TransferPair::build(
                        TransferDraft {
                            owner: cmd.owner.clone(),
                            source_account: source.id,
                            destination_account: destination.id,
                            amount: cmd.amount,
                            category: category.reference,
                            notes,
                            status: cmd.status,
                            occurred_at: cmd.occurred_at,
                        },
                        now,
                    )?;
                    for leg in pair.legs() {
                        plan_row_change(&mut plan, None, Some(leg))?;
                        plan.stamp(leg.account_id);
                    }
                    (pair.source, Some(pair.destination))
                }
                None => {
                    let tx = Transaction::new(
                        cmd.owner.clone(),
                        source.id,
                        cmd.kind,
                        direction,
                        cmd.status,
                        category.reference,
                        cmd.amount,
                        notes,
                        cmd.occurred_at,
                        now,
                    )?;
                    plan_row_change(&mut plan, None, Some(&tx))?;
                    plan.stamp(tx.account_id);
                    (tx, None)
                }
            };

            self.apply_balance_plan(&db_tx, &plan, now).await?;
            self.insert_transaction(&db_tx, &transaction).await?;
            if let Some(counterpart) = &counterpart {
                self.insert_transaction(&db_tx, counterpart).await?;
            }

            let account_ids = std::iter::once(transaction.account_id)
                .chain(counterpart.as_ref().map(|leg| leg.account_id));
            let accounts = self.accounts_snapshot(&db_tx, account_ids).await?;
            info!(
                transaction_id = %transaction.id,
                kind = transaction.kind.as_str(),
                amount = %transaction.amount,
                status = transaction.status.as_str(),
                "transaction created"
            );
            Ok(TransactionReceipt {
                transaction,
                counterpart,
                accounts,
            })
        })
    }
}
