//! Closed enums shared across the screening pipeline.
//!
//! Every status/category field is a tagged enum with exhaustive matching,
//! never a free string. The `as_str`/`parse` pairs are the single source
//! of truth for the wire and database representations.

use serde::{Deserialize, Serialize};

/// Transaction channel. Payloads may omit it; the pipeline then infers
/// it from the particulars text, falling back to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Cash,
    Transfer,
    Wire,
    Card,
    Mobile,
    Other,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Cash,
        Channel::Transfer,
        Channel::Wire,
        Channel::Card,
        Channel::Mobile,
        Channel::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Cash => "cash",
            Channel::Transfer => "transfer",
            Channel::Wire => "wire",
            Channel::Card => "card",
            Channel::Mobile => "mobile",
            Channel::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Channel> {
        Channel::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

/// Aggregation period for a transaction limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Daily, Period::Weekly, Period::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Period> {
        Period::ALL.iter().copied().find(|p| p.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebitCredit {
    Debit,
    Credit,
}

impl DebitCredit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebitCredit::Debit => "debit",
            DebitCredit::Credit => "credit",
        }
    }

    pub fn parse(s: &str) -> Option<DebitCredit> {
        match s {
            "debit" => Some(DebitCredit::Debit),
            "credit" => Some(DebitCredit::Credit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemptionType {
    Temporary,
    Permanent,
    Conditional,
    UnderReview,
}

impl ExemptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExemptionType::Temporary => "temporary",
            ExemptionType::Permanent => "permanent",
            ExemptionType::Conditional => "conditional",
            ExemptionType::UnderReview => "under_review",
        }
    }

    pub fn parse(s: &str) -> Option<ExemptionType> {
        match s {
            "temporary" => Some(ExemptionType::Temporary),
            "permanent" => Some(ExemptionType::Permanent),
            "conditional" => Some(ExemptionType::Conditional),
            "under_review" => Some(ExemptionType::UnderReview),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchlistCategory {
    HighRisk,
    Pep,
    Sanctions,
    AdverseMedia,
    Internal,
    Other,
}

impl WatchlistCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchlistCategory::HighRisk => "high_risk",
            WatchlistCategory::Pep => "pep",
            WatchlistCategory::Sanctions => "sanctions",
            WatchlistCategory::AdverseMedia => "adverse_media",
            WatchlistCategory::Internal => "internal",
            WatchlistCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<WatchlistCategory> {
        match s {
            "high_risk" => Some(WatchlistCategory::HighRisk),
            "pep" => Some(WatchlistCategory::Pep),
            "sanctions" => Some(WatchlistCategory::Sanctions),
            "adverse_media" => Some(WatchlistCategory::AdverseMedia),
            "internal" => Some(WatchlistCategory::Internal),
            "other" => Some(WatchlistCategory::Other),
            _ => None,
        }
    }
}

/// Risk level derived from the 0-100 risk score via configured breakpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<RiskLevel> {
        match s {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

/// Reviewer-driven case lifecycle. The transition graph is flat: any
/// state can move to any other, mirroring human triage rather than a
/// strict pipeline. Values outside this enum are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Suspicious,
    Pending,
    Reviewed,
    Escalated,
    NotCompliant,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Suspicious => "suspicious",
            CaseStatus::Pending => "pending",
            CaseStatus::Reviewed => "reviewed",
            CaseStatus::Escalated => "escalated",
            CaseStatus::NotCompliant => "not_compliant",
        }
    }

    pub fn parse(s: &str) -> Option<CaseStatus> {
        match s {
            "suspicious" => Some(CaseStatus::Suspicious),
            "pending" => Some(CaseStatus::Pending),
            "reviewed" => Some(CaseStatus::Reviewed),
            "escalated" => Some(CaseStatus::Escalated),
            "not_compliant" => Some(CaseStatus::NotCompliant),
            _ => None,
        }
    }
}

/// Why a transaction was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    LimitExceeded,
    ThresholdAlert,
    WatchlistMatch,
}

impl TriggerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReason::LimitExceeded => "limit_exceeded",
            TriggerReason::ThresholdAlert => "threshold_alert",
            TriggerReason::WatchlistMatch => "watchlist_match",
        }
    }

    pub fn parse(s: &str) -> Option<TriggerReason> {
        match s {
            "limit_exceeded" => Some(TriggerReason::LimitExceeded),
            "threshold_alert" => Some(TriggerReason::ThresholdAlert),
            "watchlist_match" => Some(TriggerReason::WatchlistMatch),
            _ => None,
        }
    }

    /// Limit-class triggers are suppressed by an active exemption;
    /// watchlist matches never are.
    pub fn is_limit_class(&self) -> bool {
        matches!(
            self,
            TriggerReason::LimitExceeded | TriggerReason::ThresholdAlert
        )
    }
}
