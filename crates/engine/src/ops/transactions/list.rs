use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
    sea_query::LikeExpr,
};

use crate::{
    CategoryRef, EngineError, ResultEngine, Transaction, TransactionKind, TransactionStatus,
    transactions,
};

use super::super::{Engine, with_tx};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
/// Results are newest first.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub account_id: Option<Uuid>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    pub category: Option<CategoryRef>,
    pub status: Option<TransactionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Whitespace separated terms; every term must appear in the notes,
    /// ignoring case.
    pub search: Option<String>,
    /// If true, includes soft deleted transactions (default: false).
    pub include_deleted: bool,
    pub limit: Option<u64>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::Validation(
            "kinds must not be empty".to_string(),
        ));
    }
    if filter.limit == Some(0) {
        return Err(EngineError::Validation("limit must be > 0".to_string()));
    }
    Ok(())
}

/// `%term%` with LIKE wildcards in the term escaped.
fn contains_pattern(term: &str) -> LikeExpr {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    LikeExpr::new(format!("%{escaped}%")).escape('\\')
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(account_id) = filter.account_id {
            self = self.filter(transactions::Column::AccountId.eq(account_id.to_string()));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
            self = self.filter(transactions::Column::Kind.is_in(kinds));
        }
        if let Some(category) = filter.category {
            self = self
                .filter(transactions::Column::CategorySource.eq(category.source_str()))
                .filter(transactions::Column::CategoryId.eq(category.id().to_string()));
        }
        if let Some(status) = filter.status {
            self = self.filter(transactions::Column::Status.eq(status.as_str()));
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(search) = &filter.search {
            for term in search.split_whitespace() {
                self = self.filter(transactions::Column::NotesNorm.like(contains_pattern(term)));
            }
        }
        if !filter.include_deleted {
            self = self.filter(transactions::Column::DeletedAt.is_null());
        }

        self
    }
}

impl Engine {
    /// Returns one transaction owned by `owner`, soft deleted ones included.
    pub async fn transaction(
        &self,
        transaction_id: Uuid,
        owner: &str,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, transaction_id, owner)
                .await?;
            Transaction::try_from(model)
        })
    }

    /// Lists the transactions of `owner` matching `filter`, newest first
    /// (`occurred_at DESC, id DESC`).
    pub async fn list_transactions(
        &self,
        owner: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;
        with_tx!(self, |db_tx| {
            if let Some(account_id) = filter.account_id {
                self.require_account(&db_tx, account_id, owner).await?;
            }

            let mut query = transactions::Entity::find()
                .filter(transactions::Column::Owner.eq(owner.to_string()))
                .apply_tx_filters(filter)
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::Id);
            if let Some(limit) = filter.limit {
                query = query.limit(limit);
            }

            let models = query.all(&db_tx).await?;
            models.into_iter().map(Transaction::try_from).collect()
        })
    }
}
