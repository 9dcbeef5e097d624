//! Pipeline tests for case lifecycle: dedup on repeated delivery, the
//! status machine, case numbering, listing, and statistics.

use amlmon_core::config::ScreeningConfig;
use amlmon_core::error::ScreenError;
use amlmon_core::pipeline::Pipeline;
use amlmon_core::reference::TransactionLimit;
use amlmon_core::store::ScreenStore;
use amlmon_core::transaction::Transaction;
use amlmon_core::types::{CaseStatus, Channel, DebitCredit, Period};
use chrono::{DateTime, TimeZone, Utc};

fn pipeline() -> Pipeline {
    let store = ScreenStore::in_memory().unwrap();
    store.migrate().unwrap();
    Pipeline::new(store, ScreeningConfig::default_test())
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap()
}

fn breach_txn(id: &str, account: &str) -> Transaction {
    Transaction {
        transaction_id: id.into(),
        account_number: account.into(),
        amount: 20_000.0,
        currency: "USD".into(),
        direction: DebitCredit::Debit,
        channel: Some(Channel::Cash),
        timestamp: now(),
        particulars: String::new(),
    }
}

fn with_cash_limit(p: &Pipeline) {
    p.with_store(|s| {
        s.upsert_limit(&TransactionLimit {
            channel: Channel::Cash,
            period: Period::Daily,
            single_cap: 10_000.0,
            cumulative_cap: 500_000.0,
            alert_threshold: 9_000.0,
        })
    })
    .unwrap();
}

/// Repeated delivery of the same transaction yields one case: the
/// second call returns the existing case number with `case_created`
/// false, and the suspicious-event count moves once.
#[test]
fn repeated_delivery_is_idempotent() {
    let p = pipeline();
    with_cash_limit(&p);
    let tx = breach_txn("T-DUP", "ACC-1");

    let first = p.process_at(&tx, now()).unwrap();
    let second = p.process_at(&tx, now()).unwrap();

    assert!(first.case_created);
    assert!(!second.case_created);
    assert_eq!(first.case_number, second.case_number);
    assert_eq!(p.with_store(|s| s.case_count()).unwrap(), 1);

    // The second delivery replays the recorded outcome rather than
    // re-screening.
    assert_eq!(second.risk_score, first.risk_score);
    assert_eq!(second.triggers.len(), first.triggers.len());
    assert_eq!(
        p.with_store(|s| s.screened_count()).unwrap(),
        1,
        "the delivery record must hold one row per transaction"
    );

    let profile = p
        .with_store(|s| s.load_profile("ACC-1"))
        .unwrap()
        .expect("profile must exist");
    assert_eq!(
        profile.suspicious_event_count, 1,
        "dedup must not double-count the suspicious event"
    );
}

/// Case numbers carry the prefix, the creation date, and a unique
/// suffix.
#[test]
fn case_numbers_are_date_stamped() {
    let p = pipeline();
    with_cash_limit(&p);

    let a = p.process_at(&breach_txn("T-1", "ACC-A"), now()).unwrap();
    let b = p.process_at(&breach_txn("T-2", "ACC-B"), now()).unwrap();

    let a = a.case_number.unwrap();
    let b = b.case_number.unwrap();
    assert!(a.starts_with("SC-20260826-"), "got {a}");
    assert_ne!(a, b, "case numbers must be unique");
}

/// New cases open as suspicious; a reviewer can move them to any of the
/// five states and back.
#[test]
fn status_transitions_are_flat() {
    let p = pipeline();
    with_cash_limit(&p);
    let outcome = p.process_at(&breach_txn("T-1", "ACC-S"), now()).unwrap();
    let case_number = outcome.case_number.unwrap();

    for status in ["pending", "reviewed", "escalated", "not_compliant", "suspicious"] {
        let updated = p
            .update_case_status(&case_number, status, Some("reviewer-7"), None)
            .unwrap();
        assert_eq!(updated.status.as_str(), status);
    }

    let case = p
        .with_store(|s| s.get_case(&case_number))
        .unwrap()
        .unwrap();
    assert_eq!(case.reviewer.as_deref(), Some("reviewer-7"));
}

/// A status outside the enum is rejected and the case row is left
/// untouched.
#[test]
fn unknown_status_is_rejected() {
    let p = pipeline();
    with_cash_limit(&p);
    let outcome = p.process_at(&breach_txn("T-1", "ACC-X"), now()).unwrap();
    let case_number = outcome.case_number.unwrap();

    let err = p
        .update_case_status(&case_number, "closed", None, None)
        .unwrap_err();
    assert!(
        matches!(err, ScreenError::InvalidStatusTransition { .. }),
        "got {err:?}"
    );

    let case = p
        .with_store(|s| s.get_case(&case_number))
        .unwrap()
        .unwrap();
    assert_eq!(case.status, CaseStatus::Suspicious, "case must be unchanged");
}

/// Transitioning a nonexistent case is an error, not a silent no-op.
#[test]
fn transition_requires_existing_case() {
    let p = pipeline();
    let err = p
        .update_case_status("SC-20260826-deadbeef", "reviewed", None, None)
        .unwrap_err();
    assert!(matches!(err, ScreenError::Validation(_)), "got {err:?}");
}

/// Listing filters by status; statistics reconcile with the listings.
#[test]
fn listing_and_statistics_agree() {
    let p = pipeline();
    with_cash_limit(&p);

    let a = p.process_at(&breach_txn("T-1", "ACC-A"), now()).unwrap();
    p.process_at(&breach_txn("T-2", "ACC-B"), now()).unwrap();
    p.process_at(&breach_txn("T-3", "ACC-C"), now()).unwrap();
    p.update_case_status(&a.case_number.unwrap(), "reviewed", None, None)
        .unwrap();

    let reviewed = p
        .with_store(|s| s.list_cases(Some(CaseStatus::Reviewed)))
        .unwrap();
    assert_eq!(reviewed.len(), 1);

    let all = p.with_store(|s| s.list_cases(None)).unwrap();
    assert_eq!(all.len(), 3);

    assert_eq!(p.with_store(|s| s.screened_count()).unwrap(), 3);
    assert_eq!(p.with_store(|s| s.case_count()).unwrap(), 3);

    let by_status = p.with_store(|s| s.case_counts_by_status()).unwrap();
    let total: i64 = by_status.iter().map(|(_, n)| n).sum();
    assert_eq!(total, 3);
    assert!(by_status
        .iter()
        .any(|(s, n)| *s == CaseStatus::Reviewed && *n == 1));
}

/// The stored case row round-trips the trigger details intact.
#[test]
fn case_row_preserves_triggers() {
    let p = pipeline();
    with_cash_limit(&p);
    let outcome = p.process_at(&breach_txn("T-1", "ACC-T"), now()).unwrap();

    let case = p
        .with_store(|s| s.get_case(&outcome.case_number.unwrap()))
        .unwrap()
        .unwrap();
    assert_eq!(case.triggers.len(), outcome.triggers.len());
    assert!(!case.triggers.is_empty());
    assert!(case.triggers[0].detail.contains("cap"));
    assert_eq!(case.account_number, "ACC-T");
    assert_eq!(case.transaction_id, "T-1");
}

/// Malformed transactions are rejected before screening and leave no
/// trace: no audit row, no case, no profile.
#[test]
fn invalid_transaction_is_rejected_before_screening() {
    let p = pipeline();
    with_cash_limit(&p);

    let mut tx = breach_txn("", "ACC-V");
    let err = p.process_at(&tx, now()).unwrap_err();
    assert!(matches!(err, ScreenError::Validation(_)));

    tx.transaction_id = "T-NEG".into();
    tx.amount = -50.0;
    let err = p.process_at(&tx, now()).unwrap_err();
    assert!(matches!(err, ScreenError::Validation(_)));

    assert_eq!(p.with_store(|s| s.screened_count()).unwrap(), 0);
    assert_eq!(p.with_store(|s| s.case_count()).unwrap(), 0);
    assert!(p.with_store(|s| s.load_profile("ACC-V")).unwrap().is_none());
}
