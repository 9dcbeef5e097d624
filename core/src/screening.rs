//! The screening engine.
//!
//! `ScreeningEngine::screen` is a pure function of the transaction, the
//! reference snapshot, and the current profile: no I/O, no clock reads
//! (`now` is an argument). The surrounding pipeline does all storage.
//!
//! EVALUATION ORDER (fixed, never reordered, no short-circuit; every
//! trigger reason is captured):
//!   1. Exemption check (waives limit/threshold checks only)
//!   2. Limit evaluation (single cap, cumulative cap, alert threshold)
//!   3. Watchlist check (never waived, even for exempt accounts)
//!   4. Risk score update

use crate::config::ScreeningConfig;
use crate::profile::{window_key, CustomerProfile};
use crate::reference::ReferenceSnapshot;
use crate::transaction::Transaction;
use crate::types::{RiskLevel, TriggerReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reason the transaction was flagged, with human-readable detail
/// for the case audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub reason: TriggerReason,
    pub detail: String,
}

/// The screening outcome for one transaction.
#[derive(Debug, Clone)]
pub struct ScreeningVerdict {
    pub exempt: bool,
    pub triggers: Vec<Trigger>,
    /// Profile with aggregates, windows, and risk score updated for
    /// this transaction. The caller persists it.
    pub profile: CustomerProfile,
    pub should_create_case: bool,
}

impl ScreeningVerdict {
    pub fn risk_score(&self) -> f64 {
        self.profile.risk_score
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.profile.risk_level
    }

    /// Highest-severity trigger: watchlist over hard limit over soft
    /// threshold.
    pub fn primary_reason(&self) -> Option<TriggerReason> {
        for reason in [
            TriggerReason::WatchlistMatch,
            TriggerReason::LimitExceeded,
            TriggerReason::ThresholdAlert,
        ] {
            if self.triggers.iter().any(|t| t.reason == reason) {
                return Some(reason);
            }
        }
        None
    }
}

pub struct ScreeningEngine {
    config: ScreeningConfig,
}

impl ScreeningEngine {
    pub fn new(config: ScreeningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    /// Screen one validated transaction against current reference data
    /// and the account's profile. The caller guarantees a profile
    /// (zeroed for unseen accounts) and a validated transaction.
    pub fn screen(
        &self,
        tx: &Transaction,
        snapshot: &ReferenceSnapshot,
        mut profile: CustomerProfile,
        now: DateTime<Utc>,
    ) -> ScreeningVerdict {
        let channel = tx.effective_channel();
        let amount = tx.amount.abs();
        let mut triggers: Vec<Trigger> = Vec::new();

        // 1. Exemption: permanent always; temporary/conditional within
        //    their validity window. Waives steps 2 only.
        let exempt = snapshot
            .exemption
            .as_ref()
            .map(|e| e.exempts_at(now))
            .unwrap_or(false);

        // 2. Limit evaluation across every (channel, period) limit row.
        //    All checks run; a single transaction can collect several
        //    limit-exceeded triggers plus a threshold alert.
        if !exempt {
            for limit in snapshot.limits.iter().filter(|l| l.channel == channel) {
                let key = window_key(limit.period, tx.timestamp);
                let prior = profile.window_total(channel, limit.period, &key);
                let cumulative = prior + amount;

                if amount > limit.single_cap {
                    triggers.push(Trigger {
                        reason: TriggerReason::LimitExceeded,
                        detail: format!(
                            "amount {:.2} exceeds {} {} single-transaction cap {:.2}",
                            amount,
                            channel.as_str(),
                            limit.period.as_str(),
                            limit.single_cap
                        ),
                    });
                }
                if cumulative > limit.cumulative_cap {
                    triggers.push(Trigger {
                        reason: TriggerReason::LimitExceeded,
                        detail: format!(
                            "cumulative {:.2} exceeds {} {} cap {:.2}",
                            cumulative,
                            channel.as_str(),
                            limit.period.as_str(),
                            limit.cumulative_cap
                        ),
                    });
                }
                // Threshold alert fires on the crossing only: was below,
                // now at or above.
                if prior < limit.alert_threshold && cumulative >= limit.alert_threshold {
                    triggers.push(Trigger {
                        reason: TriggerReason::ThresholdAlert,
                        detail: format!(
                            "cumulative {:.2} crossed {} {} alert threshold {:.2}",
                            cumulative,
                            channel.as_str(),
                            limit.period.as_str(),
                            limit.alert_threshold
                        ),
                    });
                }
            }
        }

        // 3. Watchlist: runs regardless of exemption status. Sanctions
        //    and PEP checks are never waived.
        if let Some(entry) = snapshot.watchlist_entry.as_ref().filter(|e| e.active) {
            triggers.push(Trigger {
                reason: TriggerReason::WatchlistMatch,
                detail: format!(
                    "account on watchlist ({}): {}",
                    entry.category.as_str(),
                    entry.reason
                ),
            });
        }

        // 4. Risk score, recomputed from this transaction's triggers,
        //    the amount relative to the account's history, and prior
        //    suspicious events. Weights are policy config; all are
        //    non-negative, so the score is monotone in triggers and
        //    clamped to [0, 100].
        let score = self.compute_risk_score(&triggers, amount, &profile);

        // Aggregates accrue for every screened transaction, exempt or
        // not, so later cumulative checks see the true totals.
        for period in crate::types::Period::ALL {
            let key = window_key(period, tx.timestamp);
            profile.record_in_window(channel, period, &key, amount);
        }
        profile.txn_count += 1;
        profile.total_amount += amount;
        profile.last_activity = Some(match profile.last_activity {
            Some(prev) if prev > tx.timestamp => prev,
            _ => tx.timestamp,
        });
        profile.risk_score = score;
        profile.risk_level = self.config.breakpoints.level_for(score);

        // An exemption suppresses limit/threshold-driven cases but
        // never a watchlist-match case.
        let only_limit_class = triggers.iter().all(|t| t.reason.is_limit_class());
        let should_create_case = !triggers.is_empty() && !(exempt && only_limit_class);

        if !triggers.is_empty() {
            log::info!(
                "account={} txn={} triggers={} exempt={} score={:.1}",
                tx.account_number,
                tx.transaction_id,
                triggers.len(),
                exempt,
                score
            );
        }

        ScreeningVerdict {
            exempt,
            triggers,
            profile,
            should_create_case,
        }
    }

    fn compute_risk_score(
        &self,
        triggers: &[Trigger],
        amount: f64,
        profile: &CustomerProfile,
    ) -> f64 {
        let w = &self.config.weights;

        let limit_hits = triggers
            .iter()
            .filter(|t| t.reason == TriggerReason::LimitExceeded)
            .count() as f64;
        let threshold_hits = triggers
            .iter()
            .filter(|t| t.reason == TriggerReason::ThresholdAlert)
            .count() as f64;
        let watchlist_hits = triggers
            .iter()
            .filter(|t| t.reason == TriggerReason::WatchlistMatch)
            .count() as f64;

        // Amount relative to the historical average, as excess ratio
        // capped so one outlier cannot saturate the score on its own.
        let amount_factor = match profile.average_amount() {
            Some(avg) if avg > 0.0 => ((amount / avg) - 1.0).clamp(0.0, self.config.zscore_cap),
            _ => 0.0,
        };

        let raw = w.exceeded_limit * limit_hits
            + w.watchlist * watchlist_hits
            + w.threshold * threshold_hits
            + w.amount_zscore * amount_factor
            + w.suspicious_history * profile.suspicious_event_count as f64;

        raw.clamp(0.0, 100.0)
    }
}
