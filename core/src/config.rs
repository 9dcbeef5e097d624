//! Screening policy configuration.
//!
//! Risk-score weights and risk-level breakpoints are policy inputs, not
//! code. They load from a JSON file in production and from
//! `default_test()` in tests.

use crate::error::{ScreenError, ScreenResult};
use crate::types::RiskLevel;
use serde::{Deserialize, Serialize};

/// Weights for the risk-score recomputation after each transaction.
/// All weights must be non-negative so that more/severer triggers can
/// never decrease the score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Per limit-exceeded trigger on this transaction.
    pub exceeded_limit: f64,
    /// Per watchlist-match trigger.
    pub watchlist: f64,
    /// Per threshold-alert trigger.
    pub threshold: f64,
    /// Per unit of transaction amount above the account's historical
    /// average (capped, see `zscore_cap`).
    pub amount_zscore: f64,
    /// Per prior suspicious event on the account.
    pub suspicious_history: f64,
}

/// Score breakpoints mapping the 0-100 risk score onto a risk level:
/// `< medium` is low, `< high` is medium, `< critical` is high, else
/// critical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBreakpoints {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl RiskBreakpoints {
    pub fn level_for(&self, score: f64) -> RiskLevel {
        if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Bounded internal retry for retryable errors (reference-data lookups,
/// write contention) before surfacing a service error to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningConfig {
    pub weights: ScoreWeights,
    pub breakpoints: RiskBreakpoints,
    pub retry: RetryPolicy,
    /// Case-number prefix, e.g. "SC" -> SC-20260826-1a2b3c4d.
    pub case_prefix: String,
    /// Upper bound on the amount-vs-average ratio factor.
    pub zscore_cap: f64,
}

impl ScreeningConfig {
    /// Load from a JSON file and validate.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ScreeningConfig = serde_json::from_str(&content)?;
        config.validate().map_err(|e| anyhow::anyhow!("{path}: {e}"))?;
        Ok(config)
    }

    /// Reject configurations that would break score monotonicity or the
    /// low < medium < high < critical breakpoint ordering.
    pub fn validate(&self) -> ScreenResult<()> {
        let w = &self.weights;
        for (name, value) in [
            ("exceeded_limit", w.exceeded_limit),
            ("watchlist", w.watchlist),
            ("threshold", w.threshold),
            ("amount_zscore", w.amount_zscore),
            ("suspicious_history", w.suspicious_history),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScreenError::Validation(format!(
                    "weight '{name}' must be finite and non-negative, got {value}"
                )));
            }
        }
        let b = &self.breakpoints;
        if !(0.0 < b.medium && b.medium < b.high && b.high < b.critical && b.critical <= 100.0) {
            return Err(ScreenError::Validation(format!(
                "breakpoints must satisfy 0 < medium < high < critical <= 100, \
                 got {}/{}/{}",
                b.medium, b.high, b.critical
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ScreenError::Validation(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if !self.zscore_cap.is_finite() || self.zscore_cap < 0.0 {
            return Err(ScreenError::Validation(format!(
                "zscore_cap must be finite and non-negative, got {}",
                self.zscore_cap
            )));
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self {
            weights: ScoreWeights {
                exceeded_limit: 30.0,
                watchlist: 40.0,
                threshold: 10.0,
                amount_zscore: 5.0,
                suspicious_history: 5.0,
            },
            breakpoints: RiskBreakpoints {
                medium: 25.0,
                high: 50.0,
                critical: 75.0,
            },
            retry: RetryPolicy { max_attempts: 3 },
            case_prefix: "SC".into(),
            zscore_cap: 4.0,
        }
    }
}
