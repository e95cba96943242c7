use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use ledger::{
    BankLink, Engine, EngineError, Money, RecordSafeTxCmd, SafeTxFilter, SafeTxKind, StoredKind,
    TxRefs,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_lock_timeout(timeout: StdDuration) -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder()
        .database(db)
        .lock_timeout(timeout)
        .build()
        .await
        .unwrap()
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

fn cmd(safe_id: Uuid, kind: SafeTxKind, major: i64, when: DateTime<Utc>) -> RecordSafeTxCmd {
    RecordSafeTxCmd::new(safe_id, kind, Money::from_major(major), when, "alice")
}

#[tokio::test]
async fn open_or_get_safe_is_idempotent() {
    let (engine, _db) = engine_with_db().await;

    let first = engine.open_or_get_safe("station-1").await.unwrap();
    let second = engine.open_or_get_safe(" station-1 ").await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.opening_balance, Money::ZERO);
    assert_eq!(first.current_balance, Money::ZERO);

    let other = engine.open_or_get_safe("station-2").await.unwrap();
    assert_ne!(first.id, other.id);

    assert_eq!(
        engine.open_or_get_safe("  ").await.unwrap_err(),
        EngineError::InvalidArgument("station id must not be empty".to_string())
    );
}

#[tokio::test]
async fn concurrent_open_returns_one_safe() {
    let (engine, db) = engine_with_db().await;

    let (a, b, c) = tokio::join!(
        engine.open_or_get_safe("station-1"),
        engine.open_or_get_safe("station-1"),
        engine.open_or_get_safe("station-1"),
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert_eq!(a.id, b.id);
    assert_eq!(b.id, c.id);

    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            "SELECT COUNT(*) AS n FROM safes",
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<i64>("", "n").unwrap(), 1);
}

#[tokio::test]
async fn replay_follows_timestamps_not_insertion() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();

    let (t1, t2) = (at(1, 8, 0), at(1, 10, 0));
    let sale = engine
        .record_transaction(cmd(safe.id, SafeTxKind::CashFuelSales, 1000, t1))
        .await
        .unwrap();
    engine
        .record_transaction(cmd(safe.id, SafeTxKind::Expense, 300, t2))
        .await
        .unwrap();
    assert_eq!(
        engine
            .compute_balance_before(safe.id, t2 + Duration::seconds(1))
            .await
            .unwrap(),
        Money::from_major(700)
    );

    // Backdated sale before everything else.
    let t0 = at(1, 6, 0);
    let backdated = engine
        .record_transaction(cmd(safe.id, SafeTxKind::CashFuelSales, 500, t0))
        .await
        .unwrap();
    assert_eq!(backdated.balance_before, Money::ZERO);
    assert_eq!(backdated.balance_after, Money::from_major(500));

    assert_eq!(
        engine
            .compute_balance_before(safe.id, t1 - Duration::seconds(1))
            .await
            .unwrap(),
        Money::from_major(500)
    );
    assert_eq!(
        engine
            .compute_balance_before(safe.id, t2 + Duration::seconds(1))
            .await
            .unwrap(),
        Money::from_major(1200)
    );

    // Stored snapshots are not rewritten by the backdated entry.
    let stale = engine.transaction(sale.id).await.unwrap();
    assert_eq!(stale.balance_before, Money::ZERO);
    assert_eq!(stale.balance_after, Money::from_major(1000));

    // The cache follows the full replay.
    let safe = engine.safe(safe.id).await.unwrap();
    assert_eq!(safe.current_balance, Money::from_major(1200));
}

#[tokio::test]
async fn opening_balance_overrides_running_balance() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();

    engine
        .record_transaction(cmd(safe.id, SafeTxKind::CashFuelSales, 9000, at(1, 8, 0)))
        .await
        .unwrap();
    let count = engine
        .record_transaction(cmd(safe.id, SafeTxKind::OpeningBalance, 5000, at(1, 12, 0)))
        .await
        .unwrap();
    assert_eq!(count.balance_before, Money::from_major(9000));
    assert_eq!(count.balance_after, Money::from_major(5000));

    engine
        .record_transaction(cmd(safe.id, SafeTxKind::PosCardPayment, 200, at(1, 13, 0)))
        .await
        .unwrap();

    assert_eq!(
        engine
            .compute_balance_before(safe.id, at(1, 12, 30))
            .await
            .unwrap(),
        Money::from_major(5000)
    );
    assert_eq!(
        engine
            .compute_balance_before(safe.id, at(1, 13, 0))
            .await
            .unwrap(),
        Money::from_major(5200)
    );
}

#[tokio::test]
async fn equal_timestamps_replay_in_insertion_order() {
    let (engine, _db) = engine_with_db().await;
    let when = at(2, 9, 0);

    let first = engine.open_or_get_safe("station-1").await.unwrap();
    engine
        .record_transaction(cmd(first.id, SafeTxKind::OpeningBalance, 100, when))
        .await
        .unwrap();
    engine
        .record_transaction(cmd(first.id, SafeTxKind::CashFuelSales, 50, when))
        .await
        .unwrap();

    let second = engine.open_or_get_safe("station-2").await.unwrap();
    engine
        .record_transaction(cmd(second.id, SafeTxKind::CashFuelSales, 50, when))
        .await
        .unwrap();
    engine
        .record_transaction(cmd(second.id, SafeTxKind::OpeningBalance, 100, when))
        .await
        .unwrap();

    assert_eq!(
        engine.compute_balance_before(first.id, when).await.unwrap(),
        Money::from_major(150)
    );
    assert_eq!(
        engine.compute_balance_before(second.id, when).await.unwrap(),
        Money::from_major(100)
    );
}

#[tokio::test]
async fn replay_is_independent_of_insertion_order() {
    let (engine, _db) = engine_with_db().await;
    let entries = [
        (SafeTxKind::CashFuelSales, 4000, at(3, 7, 0)),
        (SafeTxKind::Expense, 250, at(3, 8, 30)),
        (SafeTxKind::OpeningBalance, 3500, at(3, 9, 0)),
        (SafeTxKind::CreditPayment, 600, at(3, 11, 15)),
        (SafeTxKind::LoanGiven, 900, at(3, 14, 0)),
        (SafeTxKind::ChequeReceived, 1200, at(3, 16, 45)),
    ];

    let forward = engine.open_or_get_safe("station-forward").await.unwrap();
    for (kind, major, when) in entries {
        engine
            .record_transaction(cmd(forward.id, kind, major, when))
            .await
            .unwrap();
    }
    let reverse = engine.open_or_get_safe("station-reverse").await.unwrap();
    for (kind, major, when) in entries.into_iter().rev() {
        engine
            .record_transaction(cmd(reverse.id, kind, major, when))
            .await
            .unwrap();
    }

    for instant in [at(3, 6, 0), at(3, 8, 0), at(3, 9, 0), at(3, 12, 0), at(3, 23, 0)] {
        assert_eq!(
            engine.compute_balance_before(forward.id, instant).await.unwrap(),
            engine.compute_balance_before(reverse.id, instant).await.unwrap(),
            "at {instant}"
        );
    }
    assert_eq!(
        engine.safe(forward.id).await.unwrap().current_balance,
        Money::from_major(4400)
    );
    assert_eq!(
        engine.safe(reverse.id).await.unwrap().current_balance,
        Money::from_major(4400)
    );
}

#[tokio::test]
async fn every_kind_moves_balance_by_its_effect() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();
    engine
        .record_transaction(cmd(safe.id, SafeTxKind::OpeningBalance, 10_000, at(4, 0, 0)))
        .await
        .unwrap();

    for (i, kind) in SafeTxKind::ALL.into_iter().enumerate() {
        let when = at(4, 1, 0) + Duration::minutes(i as i64);
        let amount = Money::new(12_345);
        let tx = engine
            .record_transaction(RecordSafeTxCmd::new(safe.id, kind, amount, when, "alice"))
            .await
            .unwrap();
        let delta = tx.balance_after - tx.balance_before;
        match kind.effect() {
            ledger::LedgerEffect::Override => assert_eq!(tx.balance_after, amount),
            ledger::LedgerEffect::Inflow => assert_eq!(delta, amount, "{kind}"),
            ledger::LedgerEffect::Outflow => assert_eq!(delta, -amount, "{kind}"),
        }
    }
}

#[tokio::test]
async fn rejects_invalid_writes() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();

    let zero = RecordSafeTxCmd::new(safe.id, SafeTxKind::Expense, Money::ZERO, at(1, 8, 0), "alice");
    assert_eq!(
        engine.record_transaction(zero).await.unwrap_err(),
        EngineError::InvalidArgument("amount must be > 0".to_string())
    );

    let missing = Uuid::new_v4();
    assert!(matches!(
        engine
            .record_transaction(cmd(missing, SafeTxKind::Expense, 10, at(1, 8, 0)))
            .await
            .unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        engine
            .compute_balance_before(missing, at(1, 8, 0))
            .await
            .unwrap_err(),
        EngineError::NotFound(_)
    ));

    let nobody = cmd(safe.id, SafeTxKind::Expense, 10, at(1, 8, 0)).description("  ");
    assert!(matches!(
        engine.record_transaction(nobody).await.unwrap_err(),
        EngineError::InvalidArgument(_)
    ));

    assert!("CASH_REFUND".parse::<SafeTxKind>().is_err());
    assert!(
        engine
            .list_transactions(safe.id, &SafeTxFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn negative_balance_is_allowed() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();

    let tx = engine
        .record_transaction(cmd(safe.id, SafeTxKind::Expense, 75, at(1, 8, 0)))
        .await
        .unwrap();
    assert_eq!(tx.balance_after, Money::from_major(-75));
    assert_eq!(
        engine.safe(safe.id).await.unwrap().current_balance,
        Money::from_major(-75)
    );
}

#[tokio::test]
async fn concurrent_writes_chain_snapshots() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();
    let when = at(5, 12, 0);

    let (a, b, c, d) = tokio::join!(
        engine.record_transaction(cmd(safe.id, SafeTxKind::CashFuelSales, 100, when)),
        engine.record_transaction(cmd(safe.id, SafeTxKind::CashFuelSales, 200, when)),
        engine.record_transaction(cmd(safe.id, SafeTxKind::Expense, 40, when)),
        engine.record_transaction(cmd(safe.id, SafeTxKind::PosCardPayment, 30, when)),
    );
    for result in [a, b, c, d] {
        result.unwrap();
    }

    let rows = engine
        .list_transactions(safe.id, &SafeTxFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);
    let mut running = Money::ZERO;
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.seq, i as i64 + 1);
        assert_eq!(row.balance_before, running);
        running = row.balance_after;
    }
    assert_eq!(running, Money::from_major(290));
    assert_eq!(engine.safe(safe.id).await.unwrap().current_balance, running);
}

#[tokio::test]
async fn bank_deposit_moves_bank_balance() {
    let (engine, db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();
    let bank = engine
        .register_bank("Commercial Bank", Some("001-2345"))
        .await
        .unwrap();

    engine
        .record_transaction(cmd(safe.id, SafeTxKind::CashFuelSales, 10_000, at(6, 8, 0)))
        .await
        .unwrap();
    let deposit = engine
        .record_transaction(
            cmd(safe.id, SafeTxKind::BankDeposit, 4000, at(6, 15, 0))
                .description("Evening deposit")
                .refs(TxRefs::default().deposit_id("dep-77"))
                .bank(BankLink::new(bank.id).reference_number("SLIP-1")),
        )
        .await
        .unwrap();

    let bank_tx_id = deposit.bank_transaction_id.unwrap();
    assert_eq!(deposit.refs.deposit_id.as_deref(), Some("dep-77"));
    assert_eq!(
        engine.bank(bank.id).await.unwrap().current_balance,
        Money::from_major(4000)
    );
    assert_eq!(
        engine.safe(safe.id).await.unwrap().current_balance,
        Money::from_major(6000)
    );

    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT amount_minor, kind, reference_number, safe_transaction_id, station_id \
             FROM bank_transactions WHERE id = ?",
            vec![bank_tx_id.to_string().into()],
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<i64>("", "amount_minor").unwrap(), 400_000);
    assert_eq!(row.try_get::<String>("", "kind").unwrap(), "DEPOSIT");
    assert_eq!(
        row.try_get::<String>("", "reference_number").unwrap(),
        "SLIP-1"
    );
    assert_eq!(
        row.try_get::<String>("", "safe_transaction_id").unwrap(),
        deposit.id.to_string()
    );
    assert_eq!(row.try_get::<String>("", "station_id").unwrap(), "station-1");
}

#[tokio::test]
async fn failed_bank_side_rolls_back_safe_write() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();
    engine
        .record_transaction(cmd(safe.id, SafeTxKind::CashFuelSales, 1000, at(6, 8, 0)))
        .await
        .unwrap();

    let err = engine
        .record_transaction(
            cmd(safe.id, SafeTxKind::BankDeposit, 800, at(6, 9, 0))
                .bank(BankLink::new(Uuid::new_v4())),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let rows = engine
        .list_transactions(safe.id, &SafeTxFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        engine.safe(safe.id).await.unwrap().current_balance,
        Money::from_major(1000)
    );

    // The safe is usable again once the failed write released it.
    engine
        .record_transaction(cmd(safe.id, SafeTxKind::BankDeposit, 800, at(6, 9, 0)))
        .await
        .unwrap();
}

#[tokio::test]
async fn unit_of_work_commits_or_discards_everything() {
    let (engine, db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();

    let mut uow = engine.begin().await.unwrap();
    engine
        .record_transaction_in(&mut uow, cmd(safe.id, SafeTxKind::CashFuelSales, 500, at(7, 8, 0)))
        .await
        .unwrap();
    engine
        .record_transaction_in(&mut uow, cmd(safe.id, SafeTxKind::Expense, 120, at(7, 9, 0)))
        .await
        .unwrap();
    drop(uow);

    assert!(
        engine
            .list_transactions(safe.id, &SafeTxFilter::default())
            .await
            .unwrap()
            .is_empty()
    );

    let mut uow = engine.begin().await.unwrap();
    let expense = engine
        .record_transaction_in(
            &mut uow,
            cmd(safe.id, SafeTxKind::Expense, 120, at(7, 9, 0))
                .refs(TxRefs::default().expense_id("exp-1")),
        )
        .await
        .unwrap();
    // The caller's own aggregate joins the same unit of work.
    uow.connection()
        .execute(Statement::from_sql_and_values(
            db.get_database_backend(),
            "UPDATE safes SET counted_by = ? WHERE id = ?",
            vec!["expense-module".into(), safe.id.to_string().into()],
        ))
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let stored = engine.transaction(expense.id).await.unwrap();
    assert_eq!(stored.refs.expense_id.as_deref(), Some("exp-1"));
    let safe = engine.safe(safe.id).await.unwrap();
    assert_eq!(safe.current_balance, Money::from_major(-120));
    assert_eq!(safe.counted_by.as_deref(), Some("expense-module"));
}

#[tokio::test]
async fn explicit_rollback_discards_writes_and_frees_safe() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();

    let mut uow = engine.begin().await.unwrap();
    engine
        .record_transaction_in(&mut uow, cmd(safe.id, SafeTxKind::CashFuelSales, 300, at(7, 8, 0)))
        .await
        .unwrap();
    uow.rollback().await.unwrap();

    let tx = engine
        .record_transaction(cmd(safe.id, SafeTxKind::CashFuelSales, 100, at(7, 9, 0)))
        .await
        .unwrap();
    assert_eq!(tx.seq, 1);
    assert_eq!(tx.balance_before, Money::ZERO);
    assert_eq!(
        engine.safe(safe.id).await.unwrap().current_balance,
        Money::from_major(100)
    );
}

#[tokio::test]
async fn busy_safe_fails_with_conflict_within_lock_timeout() {
    let engine = engine_with_lock_timeout(StdDuration::from_millis(200)).await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();
    let other = engine.open_or_get_safe("station-2").await.unwrap();

    let mut uow = engine.begin().await.unwrap();
    engine
        .record_transaction_in(&mut uow, cmd(safe.id, SafeTxKind::CashFuelSales, 500, at(8, 8, 0)))
        .await
        .unwrap();

    // Same safe: blocked on the safe lock.
    let started = Instant::now();
    let err = engine
        .record_transaction(cmd(safe.id, SafeTxKind::Expense, 100, at(8, 9, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConcurrencyConflict(_)), "{err:?}");
    assert!(err.is_retryable());
    assert!(started.elapsed() < StdDuration::from_secs(5));

    // Another safe: blocked on the connection held by the open unit of work.
    let started = Instant::now();
    let err = engine
        .record_transaction(cmd(other.id, SafeTxKind::Expense, 100, at(8, 9, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConcurrencyConflict(_)), "{err:?}");
    assert!(started.elapsed() < StdDuration::from_secs(5));

    uow.commit().await.unwrap();

    let retried = engine
        .record_transaction(cmd(safe.id, SafeTxKind::Expense, 100, at(8, 9, 0)))
        .await
        .unwrap();
    assert_eq!(retried.balance_before, Money::from_major(500));
    assert_eq!(retried.balance_after, Money::from_major(400));
}

#[tokio::test]
async fn count_safe_records_override() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();
    engine
        .record_transaction(cmd(safe.id, SafeTxKind::CashFuelSales, 2000, at(8, 8, 0)))
        .await
        .unwrap();

    let counted_at = at(8, 20, 0);
    let count = engine
        .count_safe("station-1", Money::from_major(1950), "bob", counted_at)
        .await
        .unwrap();
    assert_eq!(count.kind, SafeTxKind::OpeningBalance);
    assert_eq!(count.balance_before, Money::from_major(2000));
    assert_eq!(count.balance_after, Money::from_major(1950));

    let safe = engine.safe(safe.id).await.unwrap();
    assert_eq!(safe.opening_balance, Money::ZERO);
    assert_eq!(safe.current_balance, Money::from_major(1950));
    assert_eq!(safe.last_counted_at, Some(counted_at));
    assert_eq!(safe.counted_by.as_deref(), Some("bob"));
}

#[tokio::test]
async fn reconcile_detects_and_refresh_repairs_drift() {
    let (engine, db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();
    for (kind, major, hour) in [
        (SafeTxKind::CashFuelSales, 3000, 8),
        (SafeTxKind::ChequeReceived, 500, 9),
        (SafeTxKind::Expense, 700, 10),
        (SafeTxKind::OpeningBalance, 2700, 11),
        (SafeTxKind::BankDeposit, 1000, 12),
    ] {
        engine
            .record_transaction(cmd(safe.id, kind, major, at(9, hour, 0)))
            .await
            .unwrap();
    }

    let clean = engine.reconcile("station-1").await.unwrap();
    assert!(clean.is_balanced);
    assert_eq!(clean.calculated_balance, Money::from_major(1700));
    assert_eq!(clean.last_opening_balance, Money::from_major(2700));
    assert_eq!(clean.total_inflows, Money::from_major(3500));
    assert_eq!(clean.total_outflows, Money::from_major(1700));
    assert_eq!((clean.inflow_count, clean.outflow_count), (2, 2));
    assert_eq!(clean.transaction_count, 5);

    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE safes SET current_balance_minor = ? WHERE id = ?",
        vec![1i64.into(), safe.id.to_string().into()],
    ))
    .await
    .unwrap();

    let drifted = engine.reconcile("station-1").await.unwrap();
    assert!(!drifted.is_balanced);
    assert_eq!(drifted.stored_balance, Money::new(1));
    assert_eq!(drifted.discrepancy, Money::new(169_999));

    assert_eq!(
        engine.refresh_current_balance(safe.id).await.unwrap(),
        Money::from_major(1700)
    );
    assert!(engine.reconcile("station-1").await.unwrap().is_balanced);

    assert!(matches!(
        engine.reconcile("station-404").await.unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[tokio::test]
async fn reconcile_reports_total_overflow() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();
    for (kind, hour) in [
        (SafeTxKind::CashFuelSales, 8),
        (SafeTxKind::Expense, 9),
        (SafeTxKind::CashFuelSales, 10),
    ] {
        engine
            .record_transaction(RecordSafeTxCmd::new(
                safe.id,
                kind,
                Money::new(i64::MAX),
                at(11, hour, 0),
                "alice",
            ))
            .await
            .unwrap();
    }

    assert_eq!(
        engine.reconcile("station-1").await.unwrap_err(),
        EngineError::InvalidArgument("reconciliation total overflow".to_string())
    );
}

#[tokio::test]
async fn unknown_stored_kind_replays_as_outflow() {
    let (engine, db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();
    engine
        .record_transaction(cmd(safe.id, SafeTxKind::CashFuelSales, 1000, at(10, 8, 0)))
        .await
        .unwrap();

    let foreign_id = Uuid::new_v4();
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO safe_transactions \
         (id, safe_id, seq, kind, amount_minor, balance_before_minor, balance_after_minor, \
          timestamp, description, performed_by, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            foreign_id.to_string().into(),
            safe.id.to_string().into(),
            2i64.into(),
            "SUPPLIER_REFUND".into(),
            25_000i64.into(),
            100_000i64.into(),
            75_000i64.into(),
            at(10, 9, 0).into(),
            "written by a newer build".into(),
            "carol".into(),
            Utc::now().into(),
        ],
    ))
    .await
    .unwrap();

    assert_eq!(
        engine
            .compute_balance_before(safe.id, at(10, 10, 0))
            .await
            .unwrap(),
        Money::from_major(750)
    );

    let foreign = engine.transaction(foreign_id).await.unwrap();
    assert_eq!(foreign.kind, StoredKind::Unknown("SUPPLIER_REFUND".to_string()));
    assert_eq!(foreign.balance_after, Money::from_major(750));

    let listed = engine
        .list_transactions(safe.id, &SafeTxFilter::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].kind, SafeTxKind::CashFuelSales);
    assert_eq!(listed[1].kind.as_str(), "SUPPLIER_REFUND");
}

#[tokio::test]
async fn list_filters_and_orders() {
    let (engine, _db) = engine_with_db().await;
    let safe = engine.open_or_get_safe("station-1").await.unwrap();
    for (kind, major, hour, shift) in [
        (SafeTxKind::CashFuelSales, 100, 8, "shift-a"),
        (SafeTxKind::Expense, 10, 9, "shift-a"),
        (SafeTxKind::CashFuelSales, 200, 14, "shift-b"),
        (SafeTxKind::LoanGiven, 20, 15, "shift-b"),
    ] {
        engine
            .record_transaction(
                cmd(safe.id, kind, major, at(11, hour, 0))
                    .refs(TxRefs::default().shift_id(shift)),
            )
            .await
            .unwrap();
    }

    let sales = engine
        .list_transactions(
            safe.id,
            &SafeTxFilter {
                kinds: Some(vec![SafeTxKind::CashFuelSales]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(sales.len(), 2);
    assert!(sales.iter().all(|tx| tx.kind == SafeTxKind::CashFuelSales));

    let afternoon = engine
        .list_transactions(
            safe.id,
            &SafeTxFilter {
                from: Some(at(11, 12, 0)),
                to: Some(at(11, 15, 0)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(afternoon.len(), 1);
    assert_eq!(afternoon[0].amount, Money::from_major(200));

    let latest = engine
        .list_transactions(
            safe.id,
            &SafeTxFilter {
                shift_id: Some("shift-b".to_string()),
                newest_first: true,
                limit: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].kind, SafeTxKind::LoanGiven);
}
