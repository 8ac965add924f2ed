//! Money policy: how a transaction moves a balance and which balances an
//! account may hold.
//!
//! Everything here is pure. The ledger computes deltas with [`delta`], gates
//! them with [`affects_balance`] and checks every projected balance with
//! [`admissible`] before anything is written.

use crate::{AccountKind, Direction, EngineError, Money, ResultEngine, TransactionKind, TransactionStatus};

/// Signed effect of a transaction on its own account.
///
/// Expenses always subtract and incomes always add, whatever direction is
/// stored. Adjustments and transfer legs follow their direction.
#[must_use]
pub fn delta(kind: TransactionKind, direction: Direction, amount: Money) -> Money {
    let direction = match kind {
        TransactionKind::Expense => Direction::Outflow,
        TransactionKind::Income => Direction::Inflow,
        TransactionKind::Transfer | TransactionKind::Adjustment => direction,
    };
    match direction {
        Direction::Inflow => amount,
        Direction::Outflow => -amount,
    }
}

/// Only cleared and reconciled transactions move the cached balance.
#[must_use]
pub fn affects_balance(status: TransactionStatus) -> bool {
    matches!(
        status,
        TransactionStatus::Cleared | TransactionStatus::Reconciled
    )
}

/// Delta actually applied for a row with the given status.
#[must_use]
pub fn effective_delta(
    kind: TransactionKind,
    direction: Direction,
    status: TransactionStatus,
    amount: Money,
) -> Money {
    if affects_balance(status) {
        delta(kind, direction, amount)
    } else {
        Money::ZERO
    }
}

/// Checks the sign rule of the account kind against a projected balance.
///
/// Cards hold debt and may never go positive; every other kind may never go
/// negative.
pub fn admissible(kind: AccountKind, projected: Money) -> ResultEngine<()> {
    match kind {
        AccountKind::Card if projected.is_positive() => Err(EngineError::PositiveCardBalance(
            format!("card balance would become {projected}"),
        )),
        AccountKind::Bank | AccountKind::Cash | AccountKind::Other if projected.is_negative() => {
            Err(EngineError::InsufficientFunds(format!(
                "balance would become {projected}"
            )))
        }
        _ => Ok(()),
    }
}

/// `balance + change`, with overflow reported as an invalid amount.
pub fn project(balance: Money, change: Money) -> ResultEngine<Money> {
    balance
        .checked_add(change)
        .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))
}
