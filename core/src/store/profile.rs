//! Customer profile reads and writes, including rolling window totals.

use super::{invalid_enum, parse_ts, ScreenStore};
use crate::error::ScreenResult;
use crate::profile::{CustomerProfile, WindowTotal};
use crate::types::{Channel, Period, RiskLevel};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl ScreenStore {
    pub fn load_profile(&self, account: &str) -> ScreenResult<Option<CustomerProfile>> {
        let head = self
            .conn
            .query_row(
                "SELECT account_number, txn_count, total_amount,
                        suspicious_event_count, last_activity, risk_score, risk_level
                 FROM customer_profile WHERE account_number = ?1",
                params![account],
                |row| {
                    let last: Option<String> = row.get(4)?;
                    let level: String = row.get(6)?;
                    Ok(CustomerProfile {
                        account_number: row.get(0)?,
                        txn_count: row.get(1)?,
                        total_amount: row.get(2)?,
                        suspicious_event_count: row.get(3)?,
                        last_activity: last.as_deref().map(parse_ts).transpose()?,
                        risk_score: row.get(5)?,
                        risk_level: RiskLevel::parse(&level)
                            .ok_or_else(|| invalid_enum("risk level", &level))?,
                        windows: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut profile) = head else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT channel, period, window_key, total_amount, txn_count
             FROM profile_window WHERE account_number = ?1",
        )?;
        let rows = stmt.query_map(params![account], |row| {
            let channel: String = row.get(0)?;
            let period: String = row.get(1)?;
            Ok(WindowTotal {
                channel: Channel::parse(&channel)
                    .ok_or_else(|| invalid_enum("channel", &channel))?,
                period: Period::parse(&period)
                    .ok_or_else(|| invalid_enum("period", &period))?,
                window_key: row.get(2)?,
                total_amount: row.get(3)?,
                txn_count: row.get(4)?,
            })
        })?;
        profile.windows = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(Some(profile))
    }

    /// Upsert the profile head row and all window totals in one
    /// transaction, so a screening call's profile write is never torn.
    pub fn save_profile(&self, profile: &CustomerProfile) -> ScreenResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO customer_profile
             (account_number, txn_count, total_amount, suspicious_event_count,
              last_activity, risk_score, risk_level, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (account_number) DO UPDATE SET
                txn_count = excluded.txn_count,
                total_amount = excluded.total_amount,
                suspicious_event_count = excluded.suspicious_event_count,
                last_activity = excluded.last_activity,
                risk_score = excluded.risk_score,
                risk_level = excluded.risk_level,
                updated_at = excluded.updated_at",
            params![
                profile.account_number,
                profile.txn_count,
                profile.total_amount,
                profile.suspicious_event_count,
                profile.last_activity.map(|t| t.to_rfc3339()),
                profile.risk_score,
                profile.risk_level.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        for w in &profile.windows {
            tx.execute(
                "INSERT INTO profile_window
                 (account_number, channel, period, window_key, total_amount, txn_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (account_number, channel, period) DO UPDATE SET
                    window_key = excluded.window_key,
                    total_amount = excluded.total_amount,
                    txn_count = excluded.txn_count",
                params![
                    profile.account_number,
                    w.channel.as_str(),
                    w.period.as_str(),
                    w.window_key,
                    w.total_amount,
                    w.txn_count,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Atomic increment of the suspicious-event count on case creation.
    pub fn record_suspicious_event(
        &self,
        account: &str,
        now: DateTime<Utc>,
    ) -> ScreenResult<()> {
        self.conn.execute(
            "INSERT INTO customer_profile
             (account_number, suspicious_event_count, last_activity, updated_at)
             VALUES (?1, 1, ?2, ?2)
             ON CONFLICT (account_number) DO UPDATE SET
                suspicious_event_count = suspicious_event_count + 1,
                last_activity = excluded.last_activity,
                updated_at = excluded.updated_at",
            params![account, now.to_rfc3339()],
        )?;
        Ok(())
    }
}
