//! End-to-end run of the comp-leave ledger: grant, consume, reverse, and the
//! scheduled expiry sweep, all against the in-memory stores.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use tabula_comp_leave::{
    BalanceProjector, ConsumptionEngine, ExecutionFilter, ExecutionStatus, ExpiryConverter,
    ExecutionLogStore, FixedClock, GrantStatus, GrantStore, InMemoryExecutionLogStore,
    InMemoryGrantStore,
    InMemoryPayRecordStore, InMemorySalaryDirectory, NewCompGrant, NoopBalanceCache,
    PayRecordStore, ReversalEngine, COMP_LEAVE_EXPIRY_JOB,
};

struct Ledger {
    grants: Arc<InMemoryGrantStore>,
    pay_records: Arc<InMemoryPayRecordStore>,
    executions: Arc<InMemoryExecutionLogStore>,
    salaries: Arc<InMemorySalaryDirectory>,
    consumption: ConsumptionEngine,
    reversal: ReversalEngine,
    converter: ExpiryConverter,
    projector: BalanceProjector,
}

/// Wire every engine over shared in-memory stores, with "now" pinned to the
/// given date.
fn ledger_at(year: i32, month: u32, day: u32) -> Ledger {
    let grants = Arc::new(InMemoryGrantStore::new());
    let pay_records = Arc::new(InMemoryPayRecordStore::new());
    let executions = Arc::new(InMemoryExecutionLogStore::new());
    let salaries = Arc::new(InMemorySalaryDirectory::new());
    let cache = Arc::new(NoopBalanceCache);
    let clock = Arc::new(FixedClock::on_date(year, month, day));

    Ledger {
        consumption: ConsumptionEngine::new(grants.clone(), cache.clone()),
        reversal: ReversalEngine::new(grants.clone(), cache.clone()),
        converter: ExpiryConverter::new(
            grants.clone(),
            pay_records.clone(),
            executions.clone(),
            salaries.clone(),
            cache,
            clock,
        ),
        projector: BalanceProjector::new(grants.clone()),
        grants,
        pay_records,
        executions,
        salaries,
    }
}

fn ymd(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn scheduled_run_sweeps_a_lone_expiring_grant() {
    // User A holds a single 8h grant expiring 2024-01-31; the scheduler
    // fires on 2024-02-01 with no explicit month, so the run targets the
    // previous month, January.
    let ledger = ledger_at(2024, 2, 1);
    let user = Uuid::new_v4();
    ledger.salaries.set_salary(user, dec!(48000)).await;
    let grant = ledger
        .grants
        .create_grant(NewCompGrant {
            user_id: user,
            hours_granted: dec!(8),
            original_rate: dec!(1.34),
            generated_date: ymd(2023, 12, 5),
            expiry_date: ymd(2024, 1, 31),
        })
        .await
        .unwrap();

    let summary = ledger.converter.run(None).await.unwrap();
    assert_eq!(summary.month.to_string(), "2024-01");
    assert_eq!(summary.grants_converted, 1);

    let record = ledger
        .pay_records
        .find_record(user, "2024-01".parse().unwrap())
        .await
        .unwrap()
        .expect("pay record written");
    assert_eq!(record.hours_expired, dec!(8));
    // 48000/240 = 200/h; 8h * 200 * 1.34 * 100 cents.
    assert_eq!(record.amount_cents, 214_400);

    let grant = ledger.grants.find_grant(grant.id).await.unwrap().unwrap();
    assert_eq!(grant.status, GrantStatus::Expired);

    let (entries, total) = ledger
        .executions
        .list(ExecutionFilter::for_job(COMP_LEAVE_EXPIRY_JOB))
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries[0].status, ExecutionStatus::Success);

    // The swept hours are gone from the balance projection.
    assert_eq!(ledger.projector.balance(user).await.unwrap(), dec!(0));
}

#[tokio::test]
async fn consume_reverse_expire_full_lifecycle() {
    let ledger = ledger_at(2024, 2, 1);
    let user = Uuid::new_v4();
    ledger.salaries.set_salary(user, dec!(48000)).await;

    let g1 = ledger
        .grants
        .create_grant(NewCompGrant {
            user_id: user,
            hours_granted: dec!(10),
            original_rate: dec!(1.34),
            generated_date: ymd(2024, 1, 1),
            expiry_date: ymd(2024, 1, 31),
        })
        .await
        .unwrap();
    let g2 = ledger
        .grants
        .create_grant(NewCompGrant {
            user_id: user,
            hours_granted: dec!(5),
            original_rate: dec!(1.67),
            generated_date: ymd(2024, 1, 15),
            expiry_date: ymd(2024, 2, 29),
        })
        .await
        .unwrap();
    assert_eq!(ledger.projector.balance(user).await.unwrap(), dec!(15));

    // Take a 12h comp leave: FIFO drains g1, dips into g2.
    let allocations = ledger.consumption.consume(user, dec!(12)).await.unwrap();
    assert_eq!(allocations.len(), 2);
    assert_eq!(ledger.projector.balance(user).await.unwrap(), dec!(3));

    // Cancel it: the exact pre-consumption state comes back.
    let receipt = ledger
        .reversal
        .reverse_allocations(user, &allocations)
        .await
        .unwrap();
    assert!(receipt.is_complete());
    assert_eq!(ledger.projector.balance(user).await.unwrap(), dec!(15));

    // January's sweep monetizes g1 in full but leaves g2 alone.
    let summary = ledger.converter.run(None).await.unwrap();
    assert_eq!(summary.grants_converted, 1);
    assert_eq!(summary.converted_grant_ids, vec![g1.id]);
    assert_eq!(ledger.projector.balance(user).await.unwrap(), dec!(5));

    let g2 = ledger.grants.find_grant(g2.id).await.unwrap().unwrap();
    assert_eq!(g2.status, GrantStatus::Active);

    // Conservation held at every step.
    for grant in ledger.grants.grants_for_user(user).await.unwrap() {
        assert_eq!(grant.hours_used + grant.hours_remaining, grant.hours_granted);
    }
}

#[tokio::test]
async fn cancelling_leave_after_the_sweep_reports_the_lost_credit() {
    let ledger = ledger_at(2024, 2, 1);
    let user = Uuid::new_v4();
    ledger.salaries.set_salary(user, dec!(48000)).await;
    ledger
        .grants
        .create_grant(NewCompGrant {
            user_id: user,
            hours_granted: dec!(8),
            original_rate: dec!(1.34),
            generated_date: ymd(2024, 1, 1),
            expiry_date: ymd(2024, 1, 31),
        })
        .await
        .unwrap();

    let allocations = ledger.consumption.consume(user, dec!(3)).await.unwrap();

    // The batch sweeps the remaining 5 hours before the cancellation lands.
    let summary = ledger.converter.run(None).await.unwrap();
    assert_eq!(summary.total_hours_expired, dec!(5));

    let receipt = ledger
        .reversal
        .reverse_allocations(user, &allocations)
        .await
        .unwrap();
    assert!(!receipt.is_complete());
    assert_eq!(receipt.restored_hours(), Decimal::ZERO);
    assert_eq!(receipt.skipped_hours(), dec!(3));

    // The pay record is untouched; remediation is payroll's, not the
    // ledger's.
    let record = ledger
        .pay_records
        .find_record(user, "2024-01".parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.hours_expired, dec!(5));
}
