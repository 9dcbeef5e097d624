//! Orchestration around the pure screening engine.
//!
//! The pipeline is what the ingestion endpoint calls, once per webhook
//! delivery. It owns all I/O: reference-data reads, profile read/write,
//! the audit row, and case creation. Per-account ordering is enforced
//! by `AccountLocks`; retryable failures are retried a bounded number
//! of times before surfacing.
//!
//! SPAN (under the account lock, fixed order):
//!   reference snapshot → profile read → screen → profile write
//!   → audit row → case create/dedup

use crate::account_locks::AccountLocks;
use crate::case::{CaseManager, SuspiciousCase};
use crate::config::ScreeningConfig;
use crate::error::ScreenResult;
use crate::profile::CustomerProfile;
use crate::reference::{ReferenceData, ReferenceSnapshot};
use crate::screening::{ScreeningEngine, Trigger};
use crate::store::ScreenStore;
use crate::transaction::Transaction;
use crate::types::RiskLevel;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

/// Screening outcome summary returned to the ingestion caller.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningOutcome {
    pub transaction_id: String,
    pub account_number: String,
    pub exempt: bool,
    pub triggers: Vec<Trigger>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// Present when the verdict escalated into a case (new or
    /// deduplicated).
    pub case_number: Option<String>,
    /// False when an existing case was returned for a repeated
    /// delivery.
    pub case_created: bool,
}

pub struct Pipeline {
    store: Mutex<ScreenStore>,
    /// When set, reference lookups go here instead of the local store
    /// tables.
    reference: Option<Box<dyn ReferenceData + Send + Sync>>,
    locks: AccountLocks,
    engine: ScreeningEngine,
    cases: CaseManager,
    max_attempts: u32,
}

impl Pipeline {
    pub fn new(store: ScreenStore, config: ScreeningConfig) -> Self {
        let cases = CaseManager::new(&config.case_prefix);
        let max_attempts = config.retry.max_attempts;
        Self {
            store: Mutex::new(store),
            reference: None,
            locks: AccountLocks::new(),
            engine: ScreeningEngine::new(config),
            cases,
            max_attempts,
        }
    }

    /// Screen against an external reference-data source (a shared
    /// compliance service, or a fixture) instead of the local store
    /// tables.
    pub fn with_reference_source(
        mut self,
        source: Box<dyn ReferenceData + Send + Sync>,
    ) -> Self {
        self.reference = Some(source);
        self
    }

    /// Screen and record one transaction, retrying retryable failures.
    /// Validation failures surface immediately and never reach the
    /// screening engine. No failure path ever yields a "pass" verdict.
    pub fn process(&self, tx: &Transaction) -> ScreenResult<ScreeningOutcome> {
        self.process_at(tx, Utc::now())
    }

    /// `process` with an explicit clock, for deterministic tests.
    pub fn process_at(
        &self,
        tx: &Transaction,
        now: DateTime<Utc>,
    ) -> ScreenResult<ScreeningOutcome> {
        tx.validate()?;

        let mut attempt = 1;
        loop {
            match self.process_once(tx, now) {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    log::warn!(
                        "screening attempt {attempt}/{} for txn {} failed, retrying: {err}",
                        self.max_attempts,
                        tx.transaction_id
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn process_once(&self, tx: &Transaction, now: DateTime<Utc>) -> ScreenResult<ScreeningOutcome> {
        // Serialize all work for this account. Re-screening an
        // unrecorded transaction is safe, so a retry re-enters here.
        let _account_guard = self.locks.lock(&tx.account_number);
        let store = self.lock_store()?;

        // The audit row is the delivery record: a repeated delivery of
        // the same (account, external transaction id) replays the
        // recorded outcome. Aggregates and window totals count each
        // transaction once.
        if let Some(prior) = store.recorded_screening(&tx.account_number, &tx.transaction_id)? {
            let case = store.case_for_transaction(&tx.account_number, &tx.transaction_id)?;
            log::debug!(
                "duplicate delivery for txn {}, replaying recorded outcome",
                tx.transaction_id
            );
            return Ok(ScreeningOutcome {
                transaction_id: tx.transaction_id.clone(),
                account_number: tx.account_number.clone(),
                exempt: prior.exempt,
                triggers: prior.triggers,
                risk_score: prior.risk_score,
                risk_level: prior.risk_level,
                case_number: case.map(|c| c.case_number),
                case_created: false,
            });
        }

        let channel = tx.effective_channel();
        let snapshot = match &self.reference {
            Some(repo) => ReferenceSnapshot::load(repo.as_ref(), &tx.account_number, channel)?,
            None => ReferenceSnapshot::load(&*store, &tx.account_number, channel)?,
        };
        let profile = store
            .load_profile(&tx.account_number)?
            .unwrap_or_else(|| CustomerProfile::new(&tx.account_number));

        let verdict = self.engine.screen(tx, &snapshot, profile, now);

        store.save_profile(&verdict.profile)?;
        store.insert_raw_transaction(
            tx,
            verdict.exempt,
            &verdict.triggers,
            verdict.risk_score(),
            verdict.risk_level(),
            now,
        )?;

        let (case_number, case_created) = if verdict.should_create_case {
            let (case, created) = self.cases.handle_verdict(&store, tx, &verdict, now)?;
            (Some(case.case_number), created)
        } else {
            (None, false)
        };

        Ok(ScreeningOutcome {
            transaction_id: tx.transaction_id.clone(),
            account_number: tx.account_number.clone(),
            exempt: verdict.exempt,
            triggers: verdict.triggers,
            risk_score: verdict.profile.risk_score,
            risk_level: verdict.profile.risk_level,
            case_number,
            case_created,
        })
    }

    // ── Admin & reporting passthroughs ─────────────────────────

    /// Reviewer-driven case status change, validated by the case
    /// manager. Unknown status values leave the case unchanged.
    pub fn update_case_status(
        &self,
        case_number: &str,
        new_status: &str,
        reviewer: Option<&str>,
        note: Option<&str>,
    ) -> ScreenResult<SuspiciousCase> {
        let store = self.lock_store()?;
        self.cases
            .transition(&store, case_number, new_status, reviewer, note)
    }

    /// Run a closure against the store under the store lock. Used by
    /// the admin CRUD and statistics surfaces.
    pub fn with_store<T>(
        &self,
        f: impl FnOnce(&ScreenStore) -> ScreenResult<T>,
    ) -> ScreenResult<T> {
        let store = self.lock_store()?;
        f(&store)
    }

    fn lock_store(&self) -> ScreenResult<std::sync::MutexGuard<'_, ScreenStore>> {
        Ok(self.store.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
