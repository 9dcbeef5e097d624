//! Reference data: exemptions, watchlist entries, transaction limits.
//!
//! The screening engine never touches storage directly; it consumes a
//! `ReferenceSnapshot` materialized from a `ReferenceData` repository.
//! Tests substitute deterministic fixtures by building snapshots by
//! hand or implementing the trait over in-memory data.
//!
//! Reads are uncached (TTL zero): a sanctions listing must be visible
//! to the very next screening call.

use crate::error::{ScreenError, ScreenResult};
use crate::types::{Channel, ExemptionType, Period, WatchlistCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An administrative override suppressing limit/threshold flags for an
/// account. Never suppresses watchlist matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exemption {
    pub account_number: String,
    pub exemption_type: ExemptionType,
    pub start_date: DateTime<Utc>,
    /// None means open-ended. Permanent exemptions ignore this field.
    pub end_date: Option<DateTime<Utc>>,
    pub conditions: Option<String>,
    pub exempted_by: Option<String>,
    pub active: bool,
}

impl Exemption {
    /// Whether this exemption waives limit/threshold checks at `now`.
    /// Permanent exemptions never expire; temporary and conditional
    /// ones apply within [start, end] (or open-ended without an end).
    /// Under-review exemptions do not exempt anything yet.
    pub fn exempts_at(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        match self.exemption_type {
            ExemptionType::Permanent => true,
            ExemptionType::Temporary | ExemptionType::Conditional => {
                self.start_date <= now && self.end_date.map_or(true, |end| now <= end)
            }
            ExemptionType::UnderReview => false,
        }
    }
}

/// An account requiring mandatory escalation regardless of amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub account_number: String,
    pub category: WatchlistCategory,
    pub reason: String,
    pub added_by: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-(channel, period) caps. The alert threshold is a softer
/// early-warning level below the hard caps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransactionLimit {
    pub channel: Channel,
    pub period: Period,
    pub single_cap: f64,
    pub cumulative_cap: f64,
    pub alert_threshold: f64,
}

impl TransactionLimit {
    /// Enforced on every admin write: 0 < threshold <= single_cap and
    /// threshold <= cumulative_cap.
    pub fn validate(&self) -> ScreenResult<()> {
        for (name, value) in [
            ("single_cap", self.single_cap),
            ("cumulative_cap", self.cumulative_cap),
            ("alert_threshold", self.alert_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScreenError::Validation(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        if self.alert_threshold > self.single_cap {
            return Err(ScreenError::Validation(format!(
                "alert_threshold {} exceeds single_cap {}",
                self.alert_threshold, self.single_cap
            )));
        }
        if self.alert_threshold > self.cumulative_cap {
            return Err(ScreenError::Validation(format!(
                "alert_threshold {} exceeds cumulative_cap {}",
                self.alert_threshold, self.cumulative_cap
            )));
        }
        Ok(())
    }
}

/// Read interface the screening pipeline depends on. Implemented by the
/// SQLite store; injected so tests can use fixtures.
pub trait ReferenceData {
    fn active_exemption_for(&self, account: &str) -> ScreenResult<Option<Exemption>>;
    fn active_watchlist_entry_for(&self, account: &str) -> ScreenResult<Option<WatchlistEntry>>;
    fn limits_for(&self, channel: Channel) -> ScreenResult<Vec<TransactionLimit>>;
}

/// The reference state one screening call runs against, read at call
/// time for a single (account, channel) pair.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSnapshot {
    pub exemption: Option<Exemption>,
    pub watchlist_entry: Option<WatchlistEntry>,
    pub limits: Vec<TransactionLimit>,
}

impl ReferenceSnapshot {
    /// Materialize the snapshot. Any lookup failure is surfaced as a
    /// retryable `ReferenceData` error: the pipeline fails closed
    /// rather than screening against partial reference state.
    pub fn load(
        repo: &dyn ReferenceData,
        account: &str,
        channel: Channel,
    ) -> ScreenResult<Self> {
        let exemption = repo
            .active_exemption_for(account)
            .map_err(reference_failure)?;
        let watchlist_entry = repo
            .active_watchlist_entry_for(account)
            .map_err(reference_failure)?;
        let limits = repo.limits_for(channel).map_err(reference_failure)?;
        Ok(Self {
            exemption,
            watchlist_entry,
            limits,
        })
    }
}

fn reference_failure(err: ScreenError) -> ScreenError {
    match err {
        ScreenError::ReferenceData(_) => err,
        other => ScreenError::ReferenceData(other.to_string()),
    }
}
