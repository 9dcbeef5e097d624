//! Per-account risk profile with rolling cumulative windows.
//!
//! One profile per account, created with zeroed aggregates on first
//! sight and never deleted. Mutated only by the screening engine and
//! the case manager.

use crate::types::{Channel, Period, RiskLevel};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Rolling cumulative total for one (channel, period) pair. The
/// `window_key` names the calendar window the total belongs to; when a
/// transaction arrives in a later window the total starts over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowTotal {
    pub channel: Channel,
    pub period: Period,
    pub window_key: String,
    pub total_amount: f64,
    pub txn_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub account_number: String,
    pub txn_count: i64,
    /// Lifetime absolute amount, used for the historical average.
    pub total_amount: f64,
    pub suspicious_event_count: i64,
    pub last_activity: Option<DateTime<Utc>>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub windows: Vec<WindowTotal>,
}

impl CustomerProfile {
    /// Zeroed profile for an unseen account.
    pub fn new(account_number: &str) -> Self {
        Self {
            account_number: account_number.to_string(),
            txn_count: 0,
            total_amount: 0.0,
            suspicious_event_count: 0,
            last_activity: None,
            risk_score: 0.0,
            risk_level: RiskLevel::Low,
            windows: Vec::new(),
        }
    }

    /// Cumulative total for (channel, period) within the window named
    /// by `key`. Zero if the stored window has rolled over or was never
    /// seen.
    pub fn window_total(&self, channel: Channel, period: Period, key: &str) -> f64 {
        self.windows
            .iter()
            .find(|w| w.channel == channel && w.period == period && w.window_key == key)
            .map(|w| w.total_amount)
            .unwrap_or(0.0)
    }

    /// Add an amount to the (channel, period) window named by `key`,
    /// resetting the total first if the stored window is older.
    pub fn record_in_window(&mut self, channel: Channel, period: Period, key: &str, amount: f64) {
        if let Some(w) = self
            .windows
            .iter_mut()
            .find(|w| w.channel == channel && w.period == period)
        {
            if w.window_key == key {
                w.total_amount += amount;
                w.txn_count += 1;
            } else {
                w.window_key = key.to_string();
                w.total_amount = amount;
                w.txn_count = 1;
            }
        } else {
            self.windows.push(WindowTotal {
                channel,
                period,
                window_key: key.to_string(),
                total_amount: amount,
                txn_count: 1,
            });
        }
    }

    /// Historical average absolute transaction amount, before the
    /// current transaction is counted. None for a fresh account.
    pub fn average_amount(&self) -> Option<f64> {
        if self.txn_count > 0 {
            Some(self.total_amount / self.txn_count as f64)
        } else {
            None
        }
    }
}

/// Calendar identity of the rolling window containing `ts`:
/// `2026-08-26` (daily), `2026-W35` (ISO weekly), `2026-08` (monthly).
pub fn window_key(period: Period, ts: DateTime<Utc>) -> String {
    match period {
        Period::Daily => ts.format("%Y-%m-%d").to_string(),
        Period::Weekly => {
            let iso = ts.iso_week();
            format!("{}-W{:02}", iso.year(), iso.week())
        }
        Period::Monthly => ts.format("%Y-%m").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_keys_follow_calendar() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 26, 13, 0, 0).unwrap();
        assert_eq!(window_key(Period::Daily, ts), "2026-08-26");
        assert_eq!(window_key(Period::Monthly, ts), "2026-08");
        assert!(window_key(Period::Weekly, ts).starts_with("2026-W"));
    }

    #[test]
    fn window_total_resets_on_rollover() {
        let mut p = CustomerProfile::new("ACC-9");
        p.record_in_window(Channel::Cash, Period::Daily, "2026-08-25", 400.0);
        p.record_in_window(Channel::Cash, Period::Daily, "2026-08-25", 100.0);
        assert_eq!(
            p.window_total(Channel::Cash, Period::Daily, "2026-08-25"),
            500.0
        );

        // Next day: the daily total starts over.
        p.record_in_window(Channel::Cash, Period::Daily, "2026-08-26", 50.0);
        assert_eq!(
            p.window_total(Channel::Cash, Period::Daily, "2026-08-26"),
            50.0
        );
        assert_eq!(p.window_total(Channel::Cash, Period::Daily, "2026-08-25"), 0.0);
    }
}
