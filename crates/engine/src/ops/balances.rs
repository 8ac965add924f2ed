use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    Account, EngineError, Money, ResultEngine, Transaction, accounts, policy, transactions,
};

use super::{Engine, with_tx};

/// Net balance movement per account for one atomic unit.
///
/// Reversing a row and re-applying its new version are both recorded here, so
/// each account is checked and written once with the net delta. Accounts are
/// kept in id order, which is also the order they are written in.
#[derive(Debug, Default)]
pub(super) struct BalancePlan {
    deltas: BTreeMap<Uuid, Money>,
    stamped: BTreeSet<Uuid>,
}

impl BalancePlan {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn add(&mut self, account_id: Uuid, delta: Money) -> ResultEngine<()> {
        let entry = self.deltas.entry(account_id).or_insert(Money::ZERO);
        *entry = policy::project(*entry, delta)?;
        Ok(())
    }

    pub(super) fn net(&self, account_id: Uuid) -> Money {
        self.deltas.get(&account_id).copied().unwrap_or_default()
    }

    /// Marks the account as having received a transaction in this unit.
    pub(super) fn stamp(&mut self, account_id: Uuid) {
        self.stamped.insert(account_id);
    }

    fn touched(&self) -> BTreeSet<Uuid> {
        self.deltas
            .iter()
            .filter(|(_, delta)| !delta.is_zero())
            .map(|(id, _)| *id)
            .chain(self.stamped.iter().copied())
            .collect()
    }
}

/// Result of comparing an account's cached balance with its history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BalanceCheck {
    pub account_id: Uuid,
    pub cached: Money,
    pub expected: Money,
}

impl BalanceCheck {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.cached == self.expected
    }
}

impl Engine {
    /// Checks and writes every account movement in `plan`.
    ///
    /// Each account is re-read inside `db_tx`, its projected balance checked
    /// with [`policy::admissible`], then written with a compare-and-swap on
    /// `version`. A lost race surfaces as [`EngineError::Conflict`] and leaves
    /// the caller to drop `db_tx`.
    pub(super) async fn apply_balance_plan(
        &self,
        db_tx: &DatabaseTransaction,
        plan: &BalancePlan,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        for account_id in plan.touched() {
            let model = accounts::Entity::find_by_id(account_id.to_string())
                .one(db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            let account = Account::try_from(model)?;
            let delta = plan.net(account_id);
            let projected = policy::project(account.balance, delta)?;
            policy::admissible(account.kind, projected).inspect_err(|_| {
                debug!(%account_id, balance = %account.balance, %delta, "balance not admissible");
            })?;

            let last_transaction_at = if plan.stamped.contains(&account_id) {
                Some(now)
            } else {
                account.last_transaction_at
            };
            self.write_balance(db_tx, &account, projected, last_transaction_at)
                .await?;
            debug!(%account_id, from = %account.balance, to = %projected, "balance updated");
        }
        Ok(())
    }

    /// Compare-and-swap of the cached balance on the row version.
    async fn write_balance(
        &self,
        db_tx: &DatabaseTransaction,
        account: &Account,
        balance: Money,
        last_transaction_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<()> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::BalanceMinor, Expr::value(balance.cents()))
            .col_expr(accounts::Column::Version, Expr::value(account.version + 1))
            .col_expr(
                accounts::Column::LastTransactionAt,
                Expr::value(last_transaction_at),
            )
            .filter(accounts::Column::Id.eq(account.id.to_string()))
            .filter(accounts::Column::Version.eq(account.version))
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::Conflict(format!(
                "account {} was modified concurrently",
                account.id
            )));
        }
        Ok(())
    }

    /// Fresh, id-ordered snapshot of `ids` as seen inside `db_tx`.
    pub(super) async fn accounts_snapshot(
        &self,
        db_tx: &DatabaseTransaction,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> ResultEngine<Vec<Account>> {
        let ids: BTreeSet<Uuid> = ids.into_iter().collect();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let model = accounts::Entity::find_by_id(id.to_string())
                .one(db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            out.push(Account::try_from(model)?);
        }
        Ok(out)
    }

    /// `initial_balance` plus the effective delta of every active row.
    async fn expected_balance(
        &self,
        db_tx: &DatabaseTransaction,
        account: &Account,
    ) -> ResultEngine<Money> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account.id.to_string()))
            .filter(transactions::Column::DeletedAt.is_null())
            .order_by_asc(transactions::Column::OccurredAt)
            .order_by_asc(transactions::Column::Id)
            .all(db_tx)
            .await?;

        let mut expected = account.initial_balance;
        for row in rows {
            let tx = Transaction::try_from(row)?;
            let delta = policy::effective_delta(tx.kind, tx.direction, tx.status, tx.amount);
            expected = policy::project(expected, delta)?;
        }
        Ok(expected)
    }

    /// Compares one account's cached balance with its transaction history.
    pub async fn verify_account(&self, account_id: Uuid, owner: &str) -> ResultEngine<BalanceCheck> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, owner).await?;
            let account = Account::try_from(model)?;
            let expected = self.expected_balance(&db_tx, &account).await?;
            Ok(BalanceCheck {
                account_id,
                cached: account.balance,
                expected,
            })
        })
    }

    /// Compares every account of `owner`, inactive ones included.
    pub async fn verify_balances(&self, owner: &str) -> ResultEngine<Vec<BalanceCheck>> {
        with_tx!(self, |db_tx| {
            let models = accounts::Entity::find()
                .filter(accounts::Column::Owner.eq(owner.to_string()))
                .order_by_asc(accounts::Column::Id)
                .all(&db_tx)
                .await?;
            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let account = Account::try_from(model)?;
                let expected = self.expected_balance(&db_tx, &account).await?;
                out.push(BalanceCheck {
                    account_id: account.id,
                    cached: account.balance,
                    expected,
                });
            }
            Ok(out)
        })
    }

    /// Rewrites cached balances from the transaction history.
    ///
    /// Operator repair for drift. Every rebuilt balance must still be
    /// admissible, otherwise nothing is written. Returns the checks as found
    /// before the repair.
    pub async fn recompute_balances(&self, owner: &str) -> ResultEngine<Vec<BalanceCheck>> {
        with_tx!(self, |db_tx| {
            let models = accounts::Entity::find()
                .filter(accounts::Column::Owner.eq(owner.to_string()))
                .order_by_asc(accounts::Column::Id)
                .all(&db_tx)
                .await?;

            let mut checks = Vec::with_capacity(models.len());
            for model in models {
                let account = Account::try_from(model)?;
                let expected = self.expected_balance(&db_tx, &account).await?;
                let check = BalanceCheck {
                    account_id: account.id,
                    cached: account.balance,
                    expected,
                };
                if !check.is_consistent() {
                    policy::admissible(account.kind, expected)?;
                    self.write_balance(&db_tx, &account, expected, account.last_transaction_at)
                        .await?;
                    info!(
                        account_id = %account.id,
                        cached = %check.cached,
                        expected = %check.expected,
                        "cached balance repaired"
                    );
                }
                checks.push(check);
            }
            Ok(checks)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_nets_reverse_and_reapply_per_account() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut plan = BalancePlan::new();
        plan.add(a, Money::new(5_000)).unwrap();
        plan.add(a, Money::new(-7_000)).unwrap();
        plan.add(b, Money::new(300)).unwrap();
        plan.add(b, Money::new(-300)).unwrap();

        assert_eq!(plan.net(a), Money::new(-2_000));
        let touched = plan.touched();
        assert!(touched.contains(&a));
        assert!(!touched.contains(&b));
    }

    #[test]
    fn stamped_accounts_are_touched_without_delta() {
        let a = Uuid::new_v4();
        let mut plan = BalancePlan::new();
        plan.stamp(a);
        assert_eq!(plan.touched().into_iter().collect::<Vec<_>>(), vec![a]);
    }
}
