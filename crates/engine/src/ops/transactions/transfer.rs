//! Transfer pairs.
//!
//! A transfer is two `Transfer` rows, one per account, that point at each
//! other. This is the only place that builds the pair or loads the partner of
//! a leg, so every mutation sees a validated pair.

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, prelude::*};
use tracing::error;
use uuid::Uuid;

use crate::{
    CategoryRef, Direction, EngineError, Money, ResultEngine, Transaction, TransactionKind,
    TransactionStatus, transactions,
};

use super::super::Engine;

/// Source and destination legs of one transfer.
#[derive(Clone, Debug)]
pub(super) struct TransferPair {
    pub(super) source: Transaction,
    pub(super) destination: Transaction,
}

pub(super) struct TransferDraft {
    pub(super) owner: String,
    pub(super) source_account: Uuid,
    pub(super) destination_account: Uuid,
    pub(super) amount: Money,
    pub(super) category: CategoryRef,
    pub(super) notes: String,
    pub(super) status: TransactionStatus,
    pub(super) occurred_at: DateTime<Utc>,
}

impl TransferPair {
    /// Builds both legs with their ids assigned and already linked.
    pub(super) fn build(draft: TransferDraft, now: DateTime<Utc>) -> ResultEngine<Self> {
        if draft.source_account == draft.destination_account {
            return Err(EngineError::SameAccount(
                "source and destination accounts must differ".to_string(),
            ));
        }
        let leg = |account_id, direction| {
            Transaction::new(
                draft.owner.clone(),
                account_id,
                TransactionKind::Transfer,
                direction,
                draft.status,
                draft.category,
                draft.amount,
                draft.notes.clone(),
                draft.occurred_at,
                now,
            )
        };
        let mut source = leg(draft.source_account, Direction::Outflow)?;
        let mut destination = leg(draft.destination_account, Direction::Inflow)?;
        source.linked_transaction = Some(destination.id);
        destination.linked_transaction = Some(source.id);

        let pair = Self {
            source,
            destination,
        };
        pair.validate()?;
        Ok(pair)
    }

    /// Orders two linked legs as (source, destination).
    pub(super) fn from_legs(a: Transaction, b: Transaction) -> ResultEngine<Self> {
        let pair = match a.direction {
            Direction::Outflow => Self {
                source: a,
                destination: b,
            },
            Direction::Inflow => Self {
                source: b,
                destination: a,
            },
        };
        pair.validate()?;
        Ok(pair)
    }

    /// Checks the structural rules every stored pair must satisfy.
    pub(super) fn validate(&self) -> ResultEngine<()> {
        let (source, destination) = (&self.source, &self.destination);
        let broken = |reason: &str| {
            Err(EngineError::BrokenTransferPair(format!(
                "transfer {} / {}: {reason}",
                source.id, destination.id
            )))
        };

        if source.kind != TransactionKind::Transfer || destination.kind != TransactionKind::Transfer
        {
            return broken("both legs must be transfers");
        }
        if source.linked_transaction != Some(destination.id)
            || destination.linked_transaction != Some(source.id)
        {
            return broken("legs are not linked to each other");
        }
        if source.direction != Direction::Outflow || destination.direction != Direction::Inflow {
            return broken("legs must have opposite directions");
        }
        if source.account_id == destination.account_id {
            return broken("legs are recorded on the same account");
        }
        if source.amount != destination.amount {
            return broken("legs have different amounts");
        }
        if source.status != destination.status
            || source.deleted_at.is_some() != destination.deleted_at.is_some()
        {
            return broken("legs are in different states");
        }
        Ok(())
    }

    pub(super) fn legs(&self) -> [&Transaction; 2] {
        [&self.source, &self.destination]
    }
}

impl Engine {
    /// Loads the partner of a transfer leg and validates the pair.
    ///
    /// A missing, unlinked or mismatched partner is reported as
    /// `BrokenTransferPair` and logged; it is never repaired here.
    pub(super) async fn load_transfer_pair(
        &self,
        db: &DatabaseTransaction,
        leg: Transaction,
    ) -> ResultEngine<TransferPair> {
        let result = self.load_transfer_pair_inner(db, leg).await;
        if let Err(EngineError::BrokenTransferPair(reason)) = &result {
            error!(%reason, "broken transfer pair");
        }
        result
    }

    async fn load_transfer_pair_inner(
        &self,
        db: &DatabaseTransaction,
        leg: Transaction,
    ) -> ResultEngine<TransferPair> {
        let Some(partner_id) = leg.linked_transaction else {
            return Err(EngineError::BrokenTransferPair(format!(
                "transfer leg {} has no linked transaction",
                leg.id
            )));
        };
        let Some(model) = transactions::Entity::find_by_id(partner_id.to_string())
            .one(db)
            .await?
        else {
            return Err(EngineError::BrokenTransferPair(format!(
                "partner {partner_id} of transfer leg {} is missing",
                leg.id
            )));
        };
        let partner = Transaction::try_from(model)?;
        if partner.owner != leg.owner {
            return Err(EngineError::BrokenTransferPair(format!(
                "partner {partner_id} of transfer leg {} belongs to another user",
                leg.id
            )));
        }
        TransferPair::from_legs(leg, partner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TransferDraft {
        TransferDraft {
            owner: "alice".to_string(),
            source_account: Uuid::new_v4(),
            destination_account: Uuid::new_v4(),
            amount: Money::new(20_000),
            category: CategoryRef::Default(Uuid::new_v4()),
            notes: "rent".to_string(),
            status: TransactionStatus::Cleared,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn built_pair_is_linked_and_symmetric() {
        let draft = draft();
        let (src, dst) = (draft.source_account, draft.destination_account);
        let pair = TransferPair::build(draft, Utc::now()).unwrap();

        assert_eq!(pair.source.account_id, src);
        assert_eq!(pair.destination.account_id, dst);
        assert_eq!(pair.source.linked_transaction, Some(pair.destination.id));
        assert_eq!(pair.destination.linked_transaction, Some(pair.source.id));
        assert_eq!(pair.source.direction, Direction::Outflow);
        assert_eq!(pair.destination.direction, Direction::Inflow);
        assert_eq!(pair.source.amount, pair.destination.amount);
    }

    #[test]
    fn same_account_is_rejected() {
        let mut draft = draft();
        draft.destination_account = draft.source_account;
        assert!(matches!(
            TransferPair::build(draft, Utc::now()),
            Err(EngineError::SameAccount(_))
        ));
    }

    #[test]
    fn legs_are_ordered_by_direction() {
        let pair = TransferPair::build(draft(), Utc::now()).unwrap();
        let reordered =
            TransferPair::from_legs(pair.destination.clone(), pair.source.clone()).unwrap();
        assert_eq!(reordered.source.id, pair.source.id);
    }

    #[test]
    fn mismatched_amounts_break_the_pair() {
        let mut pair = TransferPair::build(draft(), Utc::now()).unwrap();
        pair.destination.amount = Money::new(1);
        assert!(matches!(
            pair.validate(),
            Err(EngineError::BrokenTransferPair(_))
        ));
    }
}
