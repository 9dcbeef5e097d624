//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database. The screening engine,
//! case manager, and pipeline call typed store methods; they never
//! execute SQL directly.

use crate::error::{ScreenError, ScreenResult};
use crate::screening::Trigger;
use crate::transaction::Transaction;
use crate::types::{CaseStatus, RiskLevel};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

mod case;
mod profile;
mod reference;

pub use case::CaseInsert;

pub struct ScreenStore {
    conn: Connection,
}

/// Outcome fields stored with the audit row, replayed for a repeated
/// delivery of the same transaction.
#[derive(Debug, Clone)]
pub struct RecordedScreening {
    pub exempt: bool,
    pub triggers: Vec<Trigger>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

impl ScreenStore {
    pub fn open(path: &str) -> ScreenResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ScreenResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ScreenResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_reference.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_screening.sql"))?;
        Ok(())
    }

    // ── Audit trail / delivery record ──────────────────────────

    /// Record a screened transaction with its computed outcome. One row
    /// per (account, external transaction id): a second insert for the
    /// same pair is a `ConcurrencyConflict`, and the recorded outcome
    /// is replayed via `recorded_screening` instead.
    pub fn insert_raw_transaction(
        &self,
        tx: &Transaction,
        exempt: bool,
        triggers: &[Trigger],
        risk_score: f64,
        risk_level: RiskLevel,
        screened_at: DateTime<Utc>,
    ) -> ScreenResult<()> {
        let result = self.conn.execute(
            "INSERT INTO raw_transaction
             (transaction_id, account_number, amount, currency, direction,
              channel, particulars, occurred_at, exempt, flagging_reasons,
              risk_score, risk_level, screened_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                tx.transaction_id,
                tx.account_number,
                tx.amount,
                tx.currency,
                tx.direction.as_str(),
                tx.effective_channel().as_str(),
                tx.particulars,
                tx.timestamp.to_rfc3339(),
                exempt,
                serde_json::to_string(triggers)?,
                risk_score,
                risk_level.as_str(),
                screened_at.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, Some(msg)))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && msg.contains("raw_transaction") =>
            {
                Err(ScreenError::ConcurrencyConflict(format!(
                    "transaction {} already recorded for account {}",
                    tx.transaction_id, tx.account_number
                )))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// The outcome recorded for a previously screened transaction, if
    /// any. The pipeline replays this on a repeated delivery so the
    /// profile and window totals count each transaction once.
    pub fn recorded_screening(
        &self,
        account: &str,
        transaction_id: &str,
    ) -> ScreenResult<Option<RecordedScreening>> {
        let row = self
            .conn
            .query_row(
                "SELECT exempt, flagging_reasons, risk_score, risk_level
                 FROM raw_transaction
                 WHERE account_number = ?1 AND transaction_id = ?2",
                params![account, transaction_id],
                |row| {
                    let exempt: bool = row.get(0)?;
                    let reasons: String = row.get(1)?;
                    let score: f64 = row.get(2)?;
                    let level: String = row.get(3)?;
                    let level = RiskLevel::parse(&level)
                        .ok_or_else(|| invalid_enum("risk level", &level))?;
                    Ok((exempt, reasons, score, level))
                },
            )
            .optional()?;
        let Some((exempt, reasons, risk_score, risk_level)) = row else {
            return Ok(None);
        };
        Ok(Some(RecordedScreening {
            exempt,
            triggers: serde_json::from_str(&reasons)?,
            risk_score,
            risk_level,
        }))
    }

    // ── Statistics (read-only reporting surface) ───────────────

    pub fn screened_count(&self) -> ScreenResult<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM raw_transaction", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn case_count(&self) -> ScreenResult<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM suspicious_case", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn case_counts_by_status(&self) -> ScreenResult<Vec<(CaseStatus, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM suspicious_case GROUP BY status ORDER BY status",
        )?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (status, count) = row?;
            let status = CaseStatus::parse(&status)
                .ok_or_else(|| invalid_enum("case status", &status))?;
            out.push((status, count));
        }
        Ok(out)
    }

    pub fn risk_level_distribution(&self) -> ScreenResult<Vec<(RiskLevel, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT risk_level, COUNT(*) FROM customer_profile GROUP BY risk_level",
        )?;
        let rows = stmt.query_map([], |row| {
            let level: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((level, count))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (level, count) = row?;
            let level =
                RiskLevel::parse(&level).ok_or_else(|| invalid_enum("risk level", &level))?;
            out.push((level, count));
        }
        Ok(out)
    }
}

/// A stored enum value no longer parses: schema and code disagree.
fn invalid_enum(field: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("invalid {field} in database: '{value}'").into(),
    )
}

/// Parse an RFC 3339 timestamp column.
fn parse_ts(value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("invalid timestamp '{value}': {e}").into(),
            )
        })
}
