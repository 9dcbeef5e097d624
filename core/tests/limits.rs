//! Pipeline tests for limit administration and evaluation: per-channel
//! scoping, window rollover, admin replacement and validation.

use amlmon_core::config::ScreeningConfig;
use amlmon_core::pipeline::Pipeline;
use amlmon_core::reference::TransactionLimit;
use amlmon_core::store::ScreenStore;
use amlmon_core::transaction::Transaction;
use amlmon_core::types::{Channel, DebitCredit, Period};
use chrono::{DateTime, TimeZone, Utc};

fn pipeline() -> Pipeline {
    let store = ScreenStore::in_memory().unwrap();
    store.migrate().unwrap();
    Pipeline::new(store, ScreeningConfig::default_test())
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, day, hour, 0, 0).unwrap()
}

fn txn_at(id: &str, account: &str, amount: f64, channel: Channel, ts: DateTime<Utc>) -> Transaction {
    Transaction {
        transaction_id: id.into(),
        account_number: account.into(),
        amount,
        currency: "USD".into(),
        direction: DebitCredit::Debit,
        channel: Some(channel),
        timestamp: ts,
        particulars: String::new(),
    }
}

fn set_limit(
    p: &Pipeline,
    channel: Channel,
    period: Period,
    single: f64,
    cumulative: f64,
    threshold: f64,
) {
    p.with_store(|s| {
        s.upsert_limit(&TransactionLimit {
            channel,
            period,
            single_cap: single,
            cumulative_cap: cumulative,
            alert_threshold: threshold,
        })
    })
    .unwrap();
}

/// Limits bind only their own channel.
#[test]
fn limits_scope_to_channel() {
    let p = pipeline();
    set_limit(&p, Channel::Cash, Period::Daily, 10_000.0, 50_000.0, 8_000.0);

    let wire = p
        .process_at(
            &txn_at("T-1", "ACC-L", 20_000.0, Channel::Wire, at(26, 10)),
            at(26, 10),
        )
        .unwrap();
    assert!(
        wire.case_number.is_none(),
        "cash limit must not bind a wire transaction"
    );

    let cash = p
        .process_at(
            &txn_at("T-2", "ACC-L", 20_000.0, Channel::Cash, at(26, 11)),
            at(26, 11),
        )
        .unwrap();
    assert!(cash.case_number.is_some());
}

/// The daily window resets at the calendar day boundary; yesterday's
/// total never counts against today.
#[test]
fn daily_window_resets_at_midnight() {
    let p = pipeline();
    set_limit(&p, Channel::Cash, Period::Daily, 40_000.0, 50_000.0, 35_000.0);

    let first = p
        .process_at(
            &txn_at("T-1", "ACC-R", 30_000.0, Channel::Cash, at(25, 23)),
            at(25, 23),
        )
        .unwrap();
    assert!(first.case_number.is_none());

    // Same amount next day: the cumulative starts over at 30k, no
    // breach of the 50k cap.
    let second = p
        .process_at(
            &txn_at("T-2", "ACC-R", 30_000.0, Channel::Cash, at(26, 1)),
            at(26, 1),
        )
        .unwrap();
    assert!(
        second.case_number.is_none(),
        "daily total must reset across the day boundary"
    );
}

/// A monthly limit keeps accruing across days within the same month.
#[test]
fn monthly_window_spans_days() {
    let p = pipeline();
    set_limit(
        &p,
        Channel::Cash,
        Period::Monthly,
        40_000.0,
        50_000.0,
        40_000.0,
    );

    let first = p
        .process_at(
            &txn_at("T-1", "ACC-M", 30_000.0, Channel::Cash, at(10, 10)),
            at(10, 10),
        )
        .unwrap();
    assert!(first.case_number.is_none());

    let second = p
        .process_at(
            &txn_at("T-2", "ACC-M", 30_000.0, Channel::Cash, at(26, 10)),
            at(26, 10),
        )
        .unwrap();
    assert!(
        second.case_number.is_some(),
        "60k within one month must breach the 50k monthly cap"
    );
}

/// Replacing a limit leaves exactly one active row; screening uses the
/// replacement on the next call.
#[test]
fn upsert_replaces_active_limit() {
    let p = pipeline();
    set_limit(&p, Channel::Cash, Period::Daily, 10_000.0, 50_000.0, 8_000.0);
    set_limit(&p, Channel::Cash, Period::Daily, 30_000.0, 90_000.0, 25_000.0);

    let limits = p
        .with_store(|s| s.get_limits_for(Channel::Cash))
        .unwrap();
    assert_eq!(limits.len(), 1, "only the replacement may be active");
    assert_eq!(limits[0].single_cap, 30_000.0);

    let outcome = p
        .process_at(
            &txn_at("T-1", "ACC-U", 20_000.0, Channel::Cash, at(26, 10)),
            at(26, 10),
        )
        .unwrap();
    assert!(
        outcome.case_number.is_none(),
        "20k is under the replaced 30k cap"
    );
}

/// Admin writes reject incoherent cap/threshold combinations.
#[test]
fn limit_write_rejects_threshold_above_caps() {
    let p = pipeline();
    let result = p.with_store(|s| {
        s.upsert_limit(&TransactionLimit {
            channel: Channel::Cash,
            period: Period::Daily,
            single_cap: 10_000.0,
            cumulative_cap: 50_000.0,
            alert_threshold: 12_000.0,
        })
    });
    assert!(result.is_err(), "threshold above single cap must be rejected");
    assert!(p
        .with_store(|s| s.get_limits_for(Channel::Cash))
        .unwrap()
        .is_empty());
}

/// A repeated delivery leaves the rolling window at its single-delivery
/// value, so later transactions are judged against the true total.
#[test]
fn repeated_delivery_keeps_window_totals_true() {
    let p = pipeline();
    set_limit(&p, Channel::Cash, Period::Daily, 60_000.0, 50_000.0, 48_000.0);

    let tx = txn_at("T-1", "ACC-DUP", 30_000.0, Channel::Cash, at(26, 10));
    p.process_at(&tx, at(26, 10)).unwrap();
    p.process_at(&tx, at(26, 11)).unwrap();

    let profile = p
        .with_store(|s| s.load_profile("ACC-DUP"))
        .unwrap()
        .expect("profile must exist");
    assert_eq!(
        profile.window_total(Channel::Cash, Period::Daily, "2026-08-26"),
        30_000.0,
        "duplicate delivery must not double-count the window"
    );
    assert_eq!(profile.txn_count, 1);
    assert_eq!(profile.total_amount, 30_000.0);

    // 30k + 15k = 45k is clean against the 50k cumulative cap; a
    // double-counted window would flag it.
    let outcome = p
        .process_at(
            &txn_at("T-2", "ACC-DUP", 15_000.0, Channel::Cash, at(26, 12)),
            at(26, 12),
        )
        .unwrap();
    assert!(outcome.triggers.is_empty(), "got {:?}", outcome.triggers);
    assert!(outcome.case_number.is_none());
}

/// Daily and weekly limits on the same channel are evaluated
/// independently, each against its own window.
#[test]
fn multiple_periods_evaluate_independently() {
    let p = pipeline();
    set_limit(&p, Channel::Cash, Period::Daily, 100_000.0, 100_000.0, 90_000.0);
    set_limit(
        &p,
        Channel::Cash,
        Period::Weekly,
        100_000.0,
        40_000.0,
        35_000.0,
    );

    // Clean against the daily cap, breaches the weekly cumulative cap.
    let outcome = p
        .process_at(
            &txn_at("T-1", "ACC-W", 50_000.0, Channel::Cash, at(26, 10)),
            at(26, 10),
        )
        .unwrap();
    assert!(
        outcome.case_number.is_some(),
        "weekly cumulative breach must escalate even when the daily limit passes"
    );
}
