//! The case manager: turns flagged verdicts into durable suspicious
//! cases, enforcing one-case-per-transaction and the status machine.

use crate::error::{ScreenError, ScreenResult};
use crate::screening::{ScreeningVerdict, Trigger};
use crate::store::{CaseInsert, ScreenStore};
use crate::transaction::Transaction;
use crate::types::{CaseStatus, Channel, TriggerReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable record of an escalation. Never deleted (compliance
/// retention); mutated only via validated status transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousCase {
    pub case_number: String,
    pub account_number: String,
    pub transaction_id: String,
    pub amount: f64,
    pub currency: String,
    pub channel: Channel,
    /// Risk score at the time of flagging.
    pub risk_score: f64,
    pub triggers: Vec<Trigger>,
    pub primary_reason: TriggerReason,
    pub status: CaseStatus,
    pub reviewer: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct CaseManager {
    case_prefix: String,
}

impl CaseManager {
    pub fn new(case_prefix: &str) -> Self {
        Self {
            case_prefix: case_prefix.to_string(),
        }
    }

    /// Record a flagged verdict. Idempotent per (account, external
    /// transaction id): a repeated webhook delivery returns the
    /// existing case unchanged with `created = false`.
    pub fn handle_verdict(
        &self,
        store: &ScreenStore,
        tx: &Transaction,
        verdict: &ScreeningVerdict,
        now: DateTime<Utc>,
    ) -> ScreenResult<(SuspiciousCase, bool)> {
        if let Some(existing) =
            store.case_for_transaction(&tx.account_number, &tx.transaction_id)?
        {
            log::debug!(
                "duplicate delivery for txn {}, returning case {}",
                tx.transaction_id,
                existing.case_number
            );
            return Ok((existing, false));
        }

        let primary_reason = verdict.primary_reason().ok_or_else(|| {
            ScreenError::Validation(format!(
                "verdict for txn {} has no triggers; nothing to escalate",
                tx.transaction_id
            ))
        })?;

        let case = SuspiciousCase {
            case_number: self.next_case_number(now),
            account_number: tx.account_number.clone(),
            transaction_id: tx.transaction_id.clone(),
            amount: tx.amount,
            currency: tx.currency.clone(),
            channel: tx.effective_channel(),
            risk_score: verdict.risk_score(),
            triggers: verdict.triggers.clone(),
            primary_reason,
            status: CaseStatus::Suspicious,
            reviewer: None,
            notes: None,
            created_at: now,
        };

        match store.insert_case(&case)? {
            CaseInsert::Inserted => {}
            // Lost the race to a concurrent delivery of the same
            // transaction: the dedup constraint held, return theirs.
            CaseInsert::DuplicateTransaction => {
                let existing = store
                    .case_for_transaction(&tx.account_number, &tx.transaction_id)?
                    .ok_or_else(|| {
                        ScreenError::ConcurrencyConflict(format!(
                            "case for txn {} vanished after duplicate insert",
                            tx.transaction_id
                        ))
                    })?;
                return Ok((existing, false));
            }
            CaseInsert::DuplicateCaseNumber => {
                return Err(ScreenError::CaseNumberCollision(case.case_number));
            }
        }

        store.record_suspicious_event(&tx.account_number, now)?;
        log::warn!(
            "case {} created for account {} txn {} ({})",
            case.case_number,
            case.account_number,
            case.transaction_id,
            primary_reason.as_str()
        );
        Ok((case, true))
    }

    /// Apply a reviewer-driven status change. The graph is flat (any
    /// move among the five states is allowed), but a value outside the
    /// enum is an `InvalidStatusTransition` and leaves the case
    /// untouched.
    pub fn transition(
        &self,
        store: &ScreenStore,
        case_number: &str,
        new_status: &str,
        reviewer: Option<&str>,
        note: Option<&str>,
    ) -> ScreenResult<SuspiciousCase> {
        let status = CaseStatus::parse(new_status).ok_or_else(|| {
            ScreenError::InvalidStatusTransition {
                case_number: case_number.to_string(),
                value: new_status.to_string(),
            }
        })?;

        store
            .update_case_status(case_number, status, reviewer, note, Utc::now())?
            .ok_or_else(|| {
                ScreenError::Validation(format!("no case with number {case_number}"))
            })
    }

    /// Globally unique, date-informative, otherwise opaque:
    /// `SC-20260826-1a2b3c4d`.
    fn next_case_number(&self, now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            self.case_prefix,
            now.format("%Y%m%d"),
            &suffix[..8]
        )
    }
}
