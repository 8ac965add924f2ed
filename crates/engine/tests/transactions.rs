mod common;

use common::*;
use engine::{
    AccountKind, CategoryRef, CreateTransactionCmd, Direction, EngineError, ErrorKind,
    TransactionKind, TransactionListFilter, TransactionStatus, UpdateTransactionCmd,
};
use uuid::Uuid;

#[tokio::test]
async fn expense_update_and_delete_move_the_balance() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 100_000).await;

    let receipt = engine
        .create_transaction(expense_cmd(&engine, bank.id, 5_000).await)
        .await
        .unwrap();
    assert_eq!(balance(&engine, bank.id).await, money(95_000));
    assert_eq!(receipt.accounts.len(), 1);
    assert_eq!(receipt.accounts[0].balance, money(95_000));
    assert!(receipt.accounts[0].last_transaction_at.is_some());

    let id = receipt.transaction.id;
    engine
        .update_transaction(UpdateTransactionCmd::new(OWNER, id).amount(money(7_000)))
        .await
        .unwrap();
    assert_eq!(balance(&engine, bank.id).await, money(93_000));

    engine.delete_transaction(OWNER, id).await.unwrap();
    assert_eq!(balance(&engine, bank.id).await, money(100_000));

    let deleted = engine.transaction(id, OWNER).await.unwrap();
    assert_eq!(deleted.status, TransactionStatus::Void);
    assert!(deleted.deleted_at.is_some());
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn bank_round_trip_returns_to_the_initial_balance() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 100_000).await;

    let coffee = engine
        .create_transaction(expense_cmd(&engine, bank.id, 5_000).await)
        .await
        .unwrap()
        .transaction
        .id;
    assert_eq!(balance(&engine, bank.id).await, money(95_000));
    let bus = engine
        .create_transaction(expense_cmd(&engine, bank.id, 2_000).await)
        .await
        .unwrap()
        .transaction
        .id;
    assert_eq!(balance(&engine, bank.id).await, money(93_000));

    let receipt = engine
        .update_transaction(UpdateTransactionCmd::new(OWNER, coffee).notes("  coffee beans "))
        .await
        .unwrap();
    assert_eq!(receipt.transaction.notes, "coffee beans");
    assert_eq!(balance(&engine, bank.id).await, money(93_000));

    engine.delete_transaction(OWNER, coffee).await.unwrap();
    engine.delete_transaction(OWNER, bus).await.unwrap();
    assert_eq!(balance(&engine, bank.id).await, money(100_000));
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn deleting_twice_is_a_no_op() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 10_000).await;
    let id = engine
        .create_transaction(expense_cmd(&engine, bank.id, 2_500).await)
        .await
        .unwrap()
        .transaction
        .id;

    engine.delete_transaction(OWNER, id).await.unwrap();
    engine.delete_transaction(OWNER, id).await.unwrap();
    assert_eq!(balance(&engine, bank.id).await, money(10_000));
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn card_balance_never_goes_positive() {
    let (engine, _db) = engine_with_db().await;
    let card = open_account(&engine, "Visa", AccountKind::Card, 0).await;

    engine
        .create_transaction(expense_cmd(&engine, card.id, 50_000).await)
        .await
        .unwrap();
    engine
        .create_transaction(expense_cmd(&engine, card.id, 60_000).await)
        .await
        .unwrap();
    assert_eq!(balance(&engine, card.id).await, money(-110_000));

    let other = open_account(&engine, "Amex", AccountKind::Card, 0).await;
    engine
        .create_transaction(expense_cmd(&engine, other.id, 50_000).await)
        .await
        .unwrap();
    let err = engine
        .create_transaction(income_cmd(&engine, other.id, 70_000).await)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PositiveCardBalance);
    assert_eq!(balance(&engine, other.id).await, money(-50_000));
}

#[tokio::test]
async fn overdraft_is_rejected_and_nothing_is_written() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 1_000).await;

    let err = engine
        .create_transaction(expense_cmd(&engine, bank.id, 1_001).await)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    let rows = engine
        .list_transactions(OWNER, &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(balance(&engine, bank.id).await, money(1_000));

    engine
        .create_transaction(expense_cmd(&engine, bank.id, 1_000).await)
        .await
        .unwrap();
    assert_eq!(balance(&engine, bank.id).await, money(0));
}

#[tokio::test]
async fn pending_rows_do_not_move_the_balance_until_cleared() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 10_000).await;

    let id = engine
        .create_transaction(
            expense_cmd(&engine, bank.id, 4_000)
                .await
                .status(TransactionStatus::Pending),
        )
        .await
        .unwrap()
        .transaction
        .id;
    assert_eq!(balance(&engine, bank.id).await, money(10_000));

    engine
        .update_transaction(
            UpdateTransactionCmd::new(OWNER, id).status(TransactionStatus::Cleared),
        )
        .await
        .unwrap();
    assert_eq!(balance(&engine, bank.id).await, money(6_000));
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn adjustment_requires_a_direction() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 10_000).await;
    let category = default_category(&engine, "Other Income").await;

    let cmd = CreateTransactionCmd::new(
        OWNER,
        bank.id,
        TransactionKind::Adjustment,
        money(500),
        category,
        day(0),
    );
    let err = engine.create_transaction(cmd.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    engine
        .create_transaction(cmd.clone().direction(Direction::Outflow))
        .await
        .unwrap();
    engine
        .create_transaction(cmd.direction(Direction::Inflow))
        .await
        .unwrap();
    assert_eq!(balance(&engine, bank.id).await, money(10_000));
}

#[tokio::test]
async fn category_polarity_is_checked() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 10_000).await;

    let mut cmd = expense_cmd(&engine, bank.id, 100).await;
    cmd.category = salary(&engine).await;
    let err = engine.create_transaction(cmd).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let id = engine
        .create_transaction(expense_cmd(&engine, bank.id, 100).await)
        .await
        .unwrap()
        .transaction
        .id;
    let err = engine
        .update_transaction(
            UpdateTransactionCmd::new(OWNER, id).kind(TransactionKind::Income),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let receipt = engine
        .update_transaction(
            UpdateTransactionCmd::new(OWNER, id)
                .kind(TransactionKind::Income)
                .category(salary(&engine).await),
        )
        .await
        .unwrap();
    assert_eq!(receipt.transaction.direction, Direction::Inflow);
    assert_eq!(balance(&engine, bank.id).await, money(10_100));
}

#[tokio::test]
async fn reassigning_moves_the_effect_between_accounts() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 10_000).await;
    let cash = open_account(&engine, "Cash", AccountKind::Cash, 5_000).await;

    let id = engine
        .create_transaction(expense_cmd(&engine, bank.id, 3_000).await)
        .await
        .unwrap()
        .transaction
        .id;
    let receipt = engine
        .update_transaction(UpdateTransactionCmd::new(OWNER, id).account_id(cash.id))
        .await
        .unwrap();
    assert_eq!(receipt.accounts.len(), 2);
    assert_eq!(balance(&engine, bank.id).await, money(10_000));
    assert_eq!(balance(&engine, cash.id).await, money(2_000));

    let err = engine
        .update_transaction(
            UpdateTransactionCmd::new(OWNER, id)
                .account_id(bank.id)
                .amount(money(20_000)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(balance(&engine, bank.id).await, money(10_000));
    assert_eq!(balance(&engine, cash.id).await, money(2_000));
    let stored = engine.transaction(id, OWNER).await.unwrap();
    assert_eq!(stored.account_id, cash.id);
    assert_eq!(stored.amount, money(3_000));
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn void_rows_reject_updates() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 10_000).await;
    let id = engine
        .create_transaction(expense_cmd(&engine, bank.id, 100).await)
        .await
        .unwrap()
        .transaction
        .id;

    let err = engine
        .update_transaction(
            UpdateTransactionCmd::new(OWNER, id).status(TransactionStatus::Void),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    engine.delete_transaction(OWNER, id).await.unwrap();
    let err = engine
        .update_transaction(UpdateTransactionCmd::new(OWNER, id).notes("late"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn empty_update_returns_the_row_unchanged() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 10_000).await;
    let created = engine
        .create_transaction(expense_cmd(&engine, bank.id, 100).await)
        .await
        .unwrap()
        .transaction;

    let receipt = engine
        .update_transaction(UpdateTransactionCmd::new(OWNER, created.id))
        .await
        .unwrap();
    assert_eq!(receipt.transaction.id, created.id);
    assert_eq!(receipt.transaction.amount, created.amount);
    assert_eq!(receipt.transaction.notes, created.notes);
    assert_eq!(balance(&engine, bank.id).await, money(9_900));
}

#[tokio::test]
async fn other_owners_are_forbidden_and_unknown_ids_not_found() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 10_000).await;
    let id = engine
        .create_transaction(expense_cmd(&engine, bank.id, 100).await)
        .await
        .unwrap()
        .transaction
        .id;

    let err = engine.transaction(id, OTHER_OWNER).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = engine.delete_transaction(OTHER_OWNER, id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let mut cmd = expense_cmd(&engine, bank.id, 100).await;
    cmd.owner = OTHER_OWNER.to_string();
    let err = engine.create_transaction(cmd).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = engine
        .transaction(Uuid::new_v4(), OWNER)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("transaction not exists".to_string()));

    let err = engine
        .create_transaction(expense_cmd(&engine, Uuid::new_v4(), 100).await)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(balance(&engine, bank.id).await, money(9_900));
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 10_000).await;

    let mut cmd = expense_cmd(&engine, bank.id, 100).await;
    cmd.category = CategoryRef::Default(Uuid::new_v4());
    let err = engine.create_transaction(cmd).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn list_filters_and_search() {
    let (engine, _db) = engine_with_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 100_000).await;
    let cash = open_account(&engine, "Cash", AccountKind::Cash, 0).await;

    let mut lunch = expense_cmd(&engine, bank.id, 1_200).await.notes("Lunch with Anna");
    lunch.occurred_at = day(1);
    let mut groceries = expense_cmd(&engine, bank.id, 5_000).await.notes("Weekly groceries");
    groceries.occurred_at = day(2);
    let mut pay = income_cmd(&engine, cash.id, 80_000).await.notes("March pay 100%");
    pay.occurred_at = day(3);

    let lunch = engine.create_transaction(lunch).await.unwrap().transaction;
    let groceries = engine.create_transaction(groceries).await.unwrap().transaction;
    let pay = engine.create_transaction(pay).await.unwrap().transaction;

    let all = engine
        .list_transactions(OWNER, &TransactionListFilter::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = all.iter().map(|tx| tx.id).collect();
    assert_eq!(ids, vec![pay.id, groceries.id, lunch.id]);

    let on_bank = engine
        .list_transactions(
            OWNER,
            &TransactionListFilter {
                account_id: Some(bank.id),
                ..TransactionListFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(on_bank.len(), 2);

    let incomes = engine
        .list_transactions(
            OWNER,
            &TransactionListFilter {
                kinds: Some(vec![TransactionKind::Income]),
                ..TransactionListFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(incomes.len(), 1);
    assert_eq!(incomes[0].id, pay.id);

    let window = engine
        .list_transactions(
            OWNER,
            &TransactionListFilter {
                from: Some(day(2)),
                to: Some(day(3)),
                ..TransactionListFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, groceries.id);

    let found = engine
        .list_transactions(
            OWNER,
            &TransactionListFilter {
                search: Some("anna LUNCH".to_string()),
                ..TransactionListFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, lunch.id);

    let literal_percent = engine
        .list_transactions(
            OWNER,
            &TransactionListFilter {
                search: Some("100%".to_string()),
                ..TransactionListFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(literal_percent.len(), 1);

    let limited = engine
        .list_transactions(
            OWNER,
            &TransactionListFilter {
                limit: Some(2),
                ..TransactionListFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    engine.delete_transaction(OWNER, lunch.id).await.unwrap();
    let visible = engine
        .list_transactions(OWNER, &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(visible.len(), 2);
    let with_deleted = engine
        .list_transactions(
            OWNER,
            &TransactionListFilter {
                include_deleted: true,
                ..TransactionListFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(with_deleted.len(), 3);

    // Case folding goes beyond ASCII.
    let coffee = engine
        .create_transaction(expense_cmd(&engine, bank.id, 450).await.notes("CAFÉ Central"))
        .await
        .unwrap()
        .transaction;
    for search in ["café", "CAFÉ", "Café central"] {
        let found = engine
            .list_transactions(
                OWNER,
                &TransactionListFilter {
                    search: Some(search.to_string()),
                    ..TransactionListFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1, "search {search:?}");
        assert_eq!(found[0].id, coffee.id);
    }

    engine
        .update_transaction(UpdateTransactionCmd::new(OWNER, coffee.id).notes("Thé vert"))
        .await
        .unwrap();
    let search = |term: &str| TransactionListFilter {
        search: Some(term.to_string()),
        ..TransactionListFilter::default()
    };
    assert!(engine.list_transactions(OWNER, &search("café")).await.unwrap().is_empty());
    assert_eq!(engine.list_transactions(OWNER, &search("THÉ")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_list_filters_are_rejected() {
    let (engine, _db) = engine_with_db().await;

    for filter in [
        TransactionListFilter {
            from: Some(day(3)),
            to: Some(day(3)),
            ..TransactionListFilter::default()
        },
        TransactionListFilter {
            kinds: Some(Vec::new()),
            ..TransactionListFilter::default()
        },
        TransactionListFilter {
            limit: Some(0),
            ..TransactionListFilter::default()
        },
    ] {
        let err = engine.list_transactions(OWNER, &filter).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

#[tokio::test]
async fn concurrent_expenses_never_overdraw() {
    let (engine, _db, path) = engine_with_file_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 100_000).await;

    let first = expense_cmd(&engine, bank.id, 60_000).await;
    let second = expense_cmd(&engine, bank.id, 60_000).await;
    let (a, b) = tokio::join!(
        engine.create_transaction(first),
        engine.create_transaction(second)
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(
        loser.kind(),
        ErrorKind::InsufficientFunds | ErrorKind::Conflict
    ));

    assert_eq!(balance(&engine, bank.id).await, money(40_000));
    assert_consistent(&engine).await;
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn restart_reads_the_same_state() {
    let (engine, db, path) = engine_with_file_db().await;
    let bank = open_account(&engine, "Checking", AccountKind::Bank, 10_000).await;
    engine
        .create_transaction(expense_cmd(&engine, bank.id, 2_000).await)
        .await
        .unwrap();
    drop(engine);

    let reopened = engine::Engine::builder()
        .database(db)
        .build()
        .await
        .unwrap();
    assert_eq!(balance(&reopened, bank.id).await, money(8_000));
    assert_eq!(
        reopened
            .list_transactions(OWNER, &TransactionListFilter::default())
            .await
            .unwrap()
            .len(),
        1
    );
    let _ = std::fs::remove_file(path);
}
