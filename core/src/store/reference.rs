//! Reference-data reads and admin writes: exemptions, watchlist,
//! transaction limits.
//!
//! Admin writes enforce the one-active-row-per-account invariant inside
//! a single SQLite transaction (deactivate-then-insert), backed by the
//! partial unique indexes in the schema.

use super::{invalid_enum, parse_ts, ScreenStore};
use crate::error::ScreenResult;
use crate::reference::{Exemption, ReferenceData, TransactionLimit, WatchlistEntry};
use crate::types::{Channel, ExemptionType, Period, WatchlistCategory};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

impl ScreenStore {
    // ── Exemptions ─────────────────────────────────────────────

    /// Create an exemption, replacing any currently active one for the
    /// account. Atomic against concurrent writers.
    pub fn insert_exemption(&self, exemption: &Exemption) -> ScreenResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE exemption SET active = 0 WHERE account_number = ?1 AND active = 1",
            params![exemption.account_number],
        )?;
        tx.execute(
            "INSERT INTO exemption
             (account_number, exemption_type, start_date, end_date,
              conditions, exempted_by, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                exemption.account_number,
                exemption.exemption_type.as_str(),
                exemption.start_date.to_rfc3339(),
                exemption.end_date.map(|d| d.to_rfc3339()),
                exemption.conditions,
                exemption.exempted_by,
                exemption.active,
                Utc::now().to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Returns true if an active exemption existed.
    pub fn deactivate_exemption(&self, account: &str) -> ScreenResult<bool> {
        let changed = self.conn.execute(
            "UPDATE exemption SET active = 0 WHERE account_number = ?1 AND active = 1",
            params![account],
        )?;
        Ok(changed > 0)
    }

    pub fn get_active_exemption(&self, account: &str) -> ScreenResult<Option<Exemption>> {
        let row = self
            .conn
            .query_row(
                "SELECT account_number, exemption_type, start_date, end_date,
                        conditions, exempted_by, active
                 FROM exemption WHERE account_number = ?1 AND active = 1",
                params![account],
                |row| {
                    let kind: String = row.get(1)?;
                    let start: String = row.get(2)?;
                    let end: Option<String> = row.get(3)?;
                    Ok(Exemption {
                        account_number: row.get(0)?,
                        exemption_type: ExemptionType::parse(&kind)
                            .ok_or_else(|| invalid_enum("exemption type", &kind))?,
                        start_date: parse_ts(&start)?,
                        end_date: end.as_deref().map(parse_ts).transpose()?,
                        conditions: row.get(4)?,
                        exempted_by: row.get(5)?,
                        active: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ── Watchlist ──────────────────────────────────────────────

    pub fn insert_watchlist_entry(&self, entry: &WatchlistEntry) -> ScreenResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE watchlist SET active = 0 WHERE account_number = ?1 AND active = 1",
            params![entry.account_number],
        )?;
        tx.execute(
            "INSERT INTO watchlist
             (account_number, category, reason, added_by, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.account_number,
                entry.category.as_str(),
                entry.reason,
                entry.added_by,
                entry.active,
                entry.created_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn deactivate_watchlist_entry(&self, account: &str) -> ScreenResult<bool> {
        let changed = self.conn.execute(
            "UPDATE watchlist SET active = 0 WHERE account_number = ?1 AND active = 1",
            params![account],
        )?;
        Ok(changed > 0)
    }

    pub fn get_active_watchlist_entry(
        &self,
        account: &str,
    ) -> ScreenResult<Option<WatchlistEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT account_number, category, reason, added_by, active, created_at
                 FROM watchlist WHERE account_number = ?1 AND active = 1",
                params![account],
                |row| {
                    let category: String = row.get(1)?;
                    let created: String = row.get(5)?;
                    Ok(WatchlistEntry {
                        account_number: row.get(0)?,
                        category: WatchlistCategory::parse(&category)
                            .ok_or_else(|| invalid_enum("watchlist category", &category))?,
                        reason: row.get(2)?,
                        added_by: row.get(3)?,
                        active: row.get(4)?,
                        created_at: parse_ts(&created)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ── Transaction limits ─────────────────────────────────────

    /// Set the limit for (channel, period), replacing any active row.
    /// Rejects caps/threshold combinations that violate
    /// 0 < threshold <= single_cap and threshold <= cumulative_cap.
    pub fn upsert_limit(&self, limit: &TransactionLimit) -> ScreenResult<()> {
        limit.validate()?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE txn_limit SET active = 0
             WHERE channel = ?1 AND period = ?2 AND active = 1",
            params![limit.channel.as_str(), limit.period.as_str()],
        )?;
        tx.execute(
            "INSERT INTO txn_limit
             (channel, period, single_cap, cumulative_cap, alert_threshold,
              active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![
                limit.channel.as_str(),
                limit.period.as_str(),
                limit.single_cap,
                limit.cumulative_cap,
                limit.alert_threshold,
                Utc::now().to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_limits_for(&self, channel: Channel) -> ScreenResult<Vec<TransactionLimit>> {
        let mut stmt = self.conn.prepare(
            "SELECT channel, period, single_cap, cumulative_cap, alert_threshold
             FROM txn_limit WHERE channel = ?1 AND active = 1",
        )?;
        let rows = stmt.query_map(params![channel.as_str()], |row| {
            let channel: String = row.get(0)?;
            let period: String = row.get(1)?;
            Ok(TransactionLimit {
                channel: Channel::parse(&channel)
                    .ok_or_else(|| invalid_enum("channel", &channel))?,
                period: Period::parse(&period)
                    .ok_or_else(|| invalid_enum("period", &period))?,
                single_cap: row.get(2)?,
                cumulative_cap: row.get(3)?,
                alert_threshold: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl ReferenceData for ScreenStore {
    fn active_exemption_for(&self, account: &str) -> ScreenResult<Option<Exemption>> {
        self.get_active_exemption(account)
    }

    fn active_watchlist_entry_for(&self, account: &str) -> ScreenResult<Option<WatchlistEntry>> {
        self.get_active_watchlist_entry(account)
    }

    fn limits_for(&self, channel: Channel) -> ScreenResult<Vec<TransactionLimit>> {
        self.get_limits_for(channel)
    }
}
