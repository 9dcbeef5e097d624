//! Inbound transaction shape and caller-level validation.

use crate::error::{ScreenError, ScreenResult};
use crate::types::{Channel, DebitCredit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single transaction event as delivered by the ingestion webhook.
/// Immutable once received; the core persists only an audit row and
/// whatever a case references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// External transaction id from the source system.
    pub transaction_id: String,
    pub account_number: String,
    pub amount: f64,
    pub currency: String,
    pub direction: DebitCredit,
    /// May be absent in the payload; inferred from particulars then.
    #[serde(default)]
    pub channel: Option<Channel>,
    pub timestamp: DateTime<Utc>,
    /// Free-text narrative from the source system.
    #[serde(default)]
    pub particulars: String,
}

impl Transaction {
    /// Caller-level validation. A failure here is a `ValidationError`:
    /// the transaction is rejected before screening and never produces
    /// a case.
    pub fn validate(&self) -> ScreenResult<()> {
        if self.transaction_id.trim().is_empty() {
            return Err(ScreenError::Validation("transaction_id is empty".into()));
        }
        if self.account_number.trim().is_empty() {
            return Err(ScreenError::Validation("account_number is empty".into()));
        }
        if !self.amount.is_finite() {
            return Err(ScreenError::Validation(format!(
                "amount is not a finite number: {}",
                self.amount
            )));
        }
        if self.amount < 0.0 {
            return Err(ScreenError::Validation(format!(
                "amount must be non-negative, got {}",
                self.amount
            )));
        }
        if self.currency.trim().is_empty() {
            return Err(ScreenError::Validation("currency is empty".into()));
        }
        Ok(())
    }

    /// The channel screening runs against: the declared channel if
    /// present, otherwise inferred from the particulars text. Unknown
    /// wording maps to `Other`, which has no channel-specific limits;
    /// limit evaluation then passes vacuously while watchlist and risk
    /// scoring still run.
    pub fn effective_channel(&self) -> Channel {
        self.channel
            .unwrap_or_else(|| infer_channel(&self.particulars))
    }
}

/// Keyword-based channel inference from the transaction narrative.
pub fn infer_channel(particulars: &str) -> Channel {
    let text = particulars.to_lowercase();
    if text.contains("cash") {
        Channel::Cash
    } else if text.contains("transfer") || text.contains("xfer") {
        Channel::Transfer
    } else if text.contains("wire") || text.contains("swift") {
        Channel::Wire
    } else if text.contains("card") || text.contains("pos") {
        Channel::Card
    } else if text.contains("mobile") || text.contains("ussd") {
        Channel::Mobile
    } else {
        Channel::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_inferred_from_particulars() {
        assert_eq!(infer_channel("CASH DEPOSIT BRANCH 012"), Channel::Cash);
        assert_eq!(infer_channel("Funds XFER to savings"), Channel::Transfer);
        assert_eq!(infer_channel("SWIFT outward remittance"), Channel::Wire);
        assert_eq!(infer_channel("POS purchase"), Channel::Card);
        assert_eq!(infer_channel("salary payment"), Channel::Other);
    }
}
