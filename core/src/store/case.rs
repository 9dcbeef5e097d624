//! Suspicious-case persistence.
//!
//! The UNIQUE (account_number, transaction_id) constraint is the
//! dedup authority: case creation is atomic with its dedup check, never
//! a read-then-write race.

use super::{invalid_enum, parse_ts, ScreenStore};
use crate::case::SuspiciousCase;
use crate::error::{ScreenError, ScreenResult};
use crate::types::{CaseStatus, Channel, TriggerReason};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

/// Outcome of a case insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseInsert {
    Inserted,
    /// The (account, transaction) dedup constraint fired; a case for
    /// this transaction already exists.
    DuplicateTransaction,
    /// The generated case number already exists. Fatal upstream.
    DuplicateCaseNumber,
}

impl ScreenStore {
    pub fn insert_case(&self, case: &SuspiciousCase) -> ScreenResult<CaseInsert> {
        let result = self.conn.execute(
            "INSERT INTO suspicious_case
             (case_number, account_number, transaction_id, amount, currency,
              channel, risk_score, flagging_reasons, primary_reason, status,
              reviewer, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                case.case_number,
                case.account_number,
                case.transaction_id,
                case.amount,
                case.currency,
                case.channel.as_str(),
                case.risk_score,
                serde_json::to_string(&case.triggers)?,
                case.primary_reason.as_str(),
                case.status.as_str(),
                case.reviewer,
                case.notes,
                case.created_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(CaseInsert::Inserted),
            Err(rusqlite::Error::SqliteFailure(e, Some(msg)))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                if msg.contains("suspicious_case.case_number") {
                    Ok(CaseInsert::DuplicateCaseNumber)
                } else if msg.contains("suspicious_case.account_number")
                    || msg.contains("suspicious_case.transaction_id")
                {
                    Ok(CaseInsert::DuplicateTransaction)
                } else {
                    Err(rusqlite::Error::SqliteFailure(e, Some(msg)).into())
                }
            }
            Err(other) => Err(other.into()),
        }
    }

    pub fn case_for_transaction(
        &self,
        account: &str,
        transaction_id: &str,
    ) -> ScreenResult<Option<SuspiciousCase>> {
        let row = self
            .conn
            .query_row(
                &format!("{CASE_COLUMNS} WHERE account_number = ?1 AND transaction_id = ?2"),
                params![account, transaction_id],
                case_row,
            )
            .optional()?;
        row.map(finish_case).transpose()
    }

    pub fn get_case(&self, case_number: &str) -> ScreenResult<Option<SuspiciousCase>> {
        let row = self
            .conn
            .query_row(
                &format!("{CASE_COLUMNS} WHERE case_number = ?1"),
                params![case_number],
                case_row,
            )
            .optional()?;
        row.map(finish_case).transpose()
    }

    /// Apply a validated status transition. Returns the updated case,
    /// or None if no such case exists. The case row is otherwise
    /// immutable.
    pub fn update_case_status(
        &self,
        case_number: &str,
        status: CaseStatus,
        reviewer: Option<&str>,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> ScreenResult<Option<SuspiciousCase>> {
        let changed = self.conn.execute(
            "UPDATE suspicious_case SET
                status = ?2,
                reviewer = COALESCE(?3, reviewer),
                notes = COALESCE(?4, notes),
                updated_at = ?5
             WHERE case_number = ?1",
            params![
                case_number,
                status.as_str(),
                reviewer,
                note,
                now.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_case(case_number)
    }

    pub fn list_cases(&self, status: Option<CaseStatus>) -> ScreenResult<Vec<SuspiciousCase>> {
        let (sql, filter) = match status {
            Some(s) => (
                format!("{CASE_COLUMNS} WHERE status = ?1 ORDER BY created_at"),
                Some(s),
            ),
            None => (format!("{CASE_COLUMNS} ORDER BY created_at"), None),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let raw: Vec<CaseRow> = match filter {
            Some(s) => stmt
                .query_map(params![s.as_str()], case_row)?
                .collect::<Result<_, _>>()?,
            None => stmt.query_map([], case_row)?.collect::<Result<_, _>>()?,
        };
        raw.into_iter().map(finish_case).collect()
    }
}

const CASE_COLUMNS: &str = "SELECT case_number, account_number, transaction_id, amount, \
     currency, channel, risk_score, flagging_reasons, primary_reason, \
     status, reviewer, notes, created_at FROM suspicious_case";

/// Raw column tuple; JSON trigger parsing happens in `finish_case` so
/// serde errors surface as `ScreenError::Serialization`.
struct CaseRow {
    case_number: String,
    account_number: String,
    transaction_id: String,
    amount: f64,
    currency: String,
    channel: Channel,
    risk_score: f64,
    flagging_reasons: String,
    primary_reason: TriggerReason,
    status: CaseStatus,
    reviewer: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

fn case_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CaseRow> {
    let channel: String = row.get(5)?;
    let primary: String = row.get(8)?;
    let status: String = row.get(9)?;
    let created: String = row.get(12)?;
    Ok(CaseRow {
        case_number: row.get(0)?,
        account_number: row.get(1)?,
        transaction_id: row.get(2)?,
        amount: row.get(3)?,
        currency: row.get(4)?,
        channel: Channel::parse(&channel).ok_or_else(|| invalid_enum("channel", &channel))?,
        risk_score: row.get(6)?,
        flagging_reasons: row.get(7)?,
        primary_reason: TriggerReason::parse(&primary)
            .ok_or_else(|| invalid_enum("trigger reason", &primary))?,
        status: CaseStatus::parse(&status).ok_or_else(|| invalid_enum("case status", &status))?,
        reviewer: row.get(10)?,
        notes: row.get(11)?,
        created_at: parse_ts(&created)?,
    })
}

fn finish_case(row: CaseRow) -> Result<SuspiciousCase, ScreenError> {
    Ok(SuspiciousCase {
        case_number: row.case_number,
        account_number: row.account_number,
        transaction_id: row.transaction_id,
        amount: row.amount,
        currency: row.currency,
        channel: row.channel,
        risk_score: row.risk_score,
        triggers: serde_json::from_str(&row.flagging_reasons)?,
        primary_reason: row.primary_reason,
        status: row.status,
        reviewer: row.reviewer,
        notes: row.notes,
        created_at: row.created_at,
    })
}
