//! Pipeline tests for watchlist semantics: mandatory escalation on any
//! amount, one active entry per account, removal taking effect.

use amlmon_core::config::ScreeningConfig;
use amlmon_core::pipeline::Pipeline;
use amlmon_core::store::ScreenStore;
use amlmon_core::reference::WatchlistEntry;
use amlmon_core::transaction::Transaction;
use amlmon_core::types::{CaseStatus, Channel, DebitCredit, TriggerReason, WatchlistCategory};
use chrono::{DateTime, TimeZone, Utc};

fn pipeline() -> Pipeline {
    let store = ScreenStore::in_memory().unwrap();
    store.migrate().unwrap();
    Pipeline::new(store, ScreeningConfig::default_test())
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap()
}

fn txn(id: &str, account: &str, amount: f64) -> Transaction {
    Transaction {
        transaction_id: id.into(),
        account_number: account.into(),
        amount,
        currency: "USD".into(),
        direction: DebitCredit::Credit,
        channel: Some(Channel::Transfer),
        timestamp: now(),
        particulars: String::new(),
    }
}

fn list(p: &Pipeline, account: &str, category: WatchlistCategory) {
    p.with_store(|s| {
        s.insert_watchlist_entry(&WatchlistEntry {
            account_number: account.into(),
            category,
            reason: "listed in test".into(),
            added_by: Some("analyst".into()),
            active: true,
            created_at: now(),
        })
    })
    .unwrap();
}

/// Any transaction on a watchlisted account escalates, amount
/// notwithstanding.
#[test]
fn watchlisted_account_flags_any_amount() {
    let p = pipeline();
    list(&p, "ACC-W", WatchlistCategory::Sanctions);

    let outcome = p.process_at(&txn("T-1", "ACC-W", 5.0), now()).unwrap();

    let case_number = outcome.case_number.expect("watchlist hit must escalate");
    let case = p
        .with_store(|s| s.get_case(&case_number))
        .unwrap()
        .expect("case row must exist");
    assert_eq!(case.status, CaseStatus::Suspicious);
    assert_eq!(case.primary_reason, TriggerReason::WatchlistMatch);
    assert_eq!(case.amount, 5.0);
}

/// Re-listing an account replaces the previous active entry; screening
/// sees only the latest category.
#[test]
fn relisting_replaces_active_entry() {
    let p = pipeline();
    list(&p, "ACC-W2", WatchlistCategory::HighRisk);
    list(&p, "ACC-W2", WatchlistCategory::Pep);

    let entry = p
        .with_store(|s| s.get_active_watchlist_entry("ACC-W2"))
        .unwrap()
        .expect("one active entry must remain");
    assert_eq!(entry.category, WatchlistCategory::Pep);
}

/// After removal, the account screens clean on the next call.
#[test]
fn removed_entry_stops_flagging() {
    let p = pipeline();
    list(&p, "ACC-W3", WatchlistCategory::Internal);

    let first = p.process_at(&txn("T-1", "ACC-W3", 100.0), now()).unwrap();
    assert!(first.case_number.is_some());

    let removed = p
        .with_store(|s| s.deactivate_watchlist_entry("ACC-W3"))
        .unwrap();
    assert!(removed);

    let second = p.process_at(&txn("T-2", "ACC-W3", 100.0), now()).unwrap();
    assert!(
        second.case_number.is_none(),
        "delisted account must screen clean"
    );
}

/// Watchlist cases count toward the account's suspicious history, which
/// feeds the next risk-score computation.
#[test]
fn watchlist_case_bumps_suspicious_history() {
    let p = pipeline();
    list(&p, "ACC-W4", WatchlistCategory::AdverseMedia);

    let first = p.process_at(&txn("T-1", "ACC-W4", 100.0), now()).unwrap();
    let second = p.process_at(&txn("T-2", "ACC-W4", 100.0), now()).unwrap();

    let profile = p
        .with_store(|s| s.load_profile("ACC-W4"))
        .unwrap()
        .expect("profile must exist");
    assert_eq!(profile.suspicious_event_count, 2);
    assert!(
        second.risk_score > first.risk_score,
        "prior suspicious event must raise the next score: {} <= {}",
        second.risk_score,
        first.risk_score
    );
}
