use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::catalog::store::load_metric_types;
use crate::error::{EigerError, EigerResult, EntityKind};
use crate::sqlite::SqliteDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    InProgress,
    Done,
    Dead,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::InProgress => "in_progress",
            OutboxStatus::Done => "done",
            OutboxStatus::Dead => "dead",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "in_progress" => Ok(OutboxStatus::InProgress),
            "done" => Ok(OutboxStatus::Done),
            "dead" => Ok(OutboxStatus::Dead),
            other => Err(format!("unknown outbox status: {other}")),
        }
    }
}

/// Fan-out intent written next to a test completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub outbox_id: i64,
    pub completed_workout_id: String,
    pub climber_id: String,
    pub workout_id: String,
    pub exercise_id: String,
    pub value: String,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl OutboxEntry {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: String = row.get("status")?;
        let status = status.parse().map_err(|message: String| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, message.into())
        })?;
        let next_attempt_at: NaiveDateTime = row.get("next_attempt_at")?;
        Ok(Self {
            outbox_id: row.get("outbox_id")?,
            completed_workout_id: row.get("completed_workout_id")?,
            climber_id: row.get("climber_id")?,
            workout_id: row.get("workout_id")?,
            exercise_id: row.get("exercise_id")?,
            value: row.get("value")?,
            status,
            attempts: row.get("attempts")?,
            next_attempt_at: Utc.from_utc_datetime(&next_attempt_at),
            last_error: row.get("last_error")?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxCounts {
    pub pending: u64,
    pub in_progress: u64,
    pub done: u64,
    pub dead: u64,
}

impl OutboxCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.in_progress + self.done + self.dead
    }
}

#[derive(Debug, Clone)]
pub struct SqliteOutboxStore {
    db: SqliteDatabase,
}

impl SqliteOutboxStore {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    /// Claims the oldest due pending entry. The write lock is taken up front
    /// so concurrent workers never claim the same row.
    pub fn reserve_due(&self, now: DateTime<Utc>) -> EigerResult<Option<OutboxEntry>> {
        let conn = self.db.open()?;
        conn.execute("BEGIN IMMEDIATE TRANSACTION", [])?;
        let reserved = (|| -> EigerResult<Option<OutboxEntry>> {
            let entry = conn
                .query_row(
                    "SELECT * FROM metric_outbox
                     WHERE status = 'pending' AND next_attempt_at <= ?1
                     ORDER BY next_attempt_at ASC, outbox_id ASC
                     LIMIT 1",
                    [now.naive_utc()],
                    |row| OutboxEntry::from_row(row),
                )
                .optional()?;
            if let Some(mut entry) = entry {
                conn.execute(
                    "UPDATE metric_outbox SET status = 'in_progress', updated_at = ?2
                     WHERE outbox_id = ?1",
                    params![entry.outbox_id, now.naive_utc()],
                )?;
                entry.status = OutboxStatus::InProgress;
                return Ok(Some(entry));
            }
            Ok(None)
        })();
        match reserved {
            Ok(Some(entry)) => {
                conn.execute("COMMIT", [])?;
                debug!(outbox_id = entry.outbox_id, attempts = entry.attempts, "outbox entry reserved");
                Ok(Some(entry))
            }
            Ok(None) => {
                conn.execute("ROLLBACK", [])?;
                Ok(None)
            }
            Err(err) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(err)
            }
        }
    }

    /// Writes one climber metric per metric type configured on the entry's
    /// exercise and closes the entry. Redelivery inserts nothing new.
    pub fn deliver(&self, entry: &OutboxEntry, now: DateTime<Utc>) -> EigerResult<usize> {
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let metric_types = load_metric_types(&tx, &entry.exercise_id)?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO climber_metrics (
                    metric_id, climber_id, workout_id, metric_type, value, outbox_id, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for metric_type in &metric_types {
                inserted += stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    entry.climber_id,
                    entry.workout_id,
                    metric_type.as_str(),
                    entry.value,
                    entry.outbox_id,
                    now.naive_utc(),
                ])?;
            }
        }
        set_status(&tx, entry.outbox_id, OutboxStatus::Done, now)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Puts a failed entry back in the queue for `next_attempt_at`.
    pub fn reschedule(
        &self,
        outbox_id: i64,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> EigerResult<()> {
        let conn = self.db.open()?;
        let affected = conn.execute(
            "UPDATE metric_outbox
             SET status = 'pending', attempts = ?2, next_attempt_at = ?3, last_error = ?4,
                 updated_at = ?5
             WHERE outbox_id = ?1",
            params![
                outbox_id,
                attempts,
                next_attempt_at.naive_utc(),
                error,
                now.naive_utc()
            ],
        )?;
        ensure_found(affected, outbox_id)
    }

    pub fn mark_dead(
        &self,
        outbox_id: i64,
        attempts: u32,
        error: &str,
        now: DateTime<Utc>,
    ) -> EigerResult<()> {
        let conn = self.db.open()?;
        let affected = conn.execute(
            "UPDATE metric_outbox
             SET status = 'dead', attempts = ?2, last_error = ?3, updated_at = ?4
             WHERE outbox_id = ?1",
            params![outbox_id, attempts, error, now.naive_utc()],
        )?;
        ensure_found(affected, outbox_id)
    }

    /// Gives a dead entry a fresh set of attempts.
    pub fn requeue(&self, outbox_id: i64, now: DateTime<Utc>) -> EigerResult<()> {
        let conn = self.db.open()?;
        let affected = conn.execute(
            "UPDATE metric_outbox
             SET status = 'pending', attempts = 0, next_attempt_at = ?2, updated_at = ?2
             WHERE outbox_id = ?1 AND status = 'dead'",
            params![outbox_id, now.naive_utc()],
        )?;
        ensure_found(affected, outbox_id)
    }

    /// Returns entries left in progress by a worker that stopped before
    /// `cutoff` to the pending queue.
    pub fn release_stale(&self, cutoff: DateTime<Utc>) -> EigerResult<usize> {
        let conn = self.db.open()?;
        let released = conn.execute(
            "UPDATE metric_outbox SET status = 'pending'
             WHERE status = 'in_progress' AND updated_at < ?1",
            [cutoff.naive_utc()],
        )?;
        Ok(released)
    }

    pub fn fetch(&self, outbox_id: i64) -> EigerResult<Option<OutboxEntry>> {
        let conn = self.db.open()?;
        let entry = conn
            .query_row(
                "SELECT * FROM metric_outbox WHERE outbox_id = ?1",
                [outbox_id],
                |row| OutboxEntry::from_row(row),
            )
            .optional()?;
        Ok(entry)
    }

    pub fn list(&self, status: Option<OutboxStatus>, limit: usize) -> EigerResult<Vec<OutboxEntry>> {
        let conn = self.db.open()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM metric_outbox
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY outbox_id DESC
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![status.map(|s| s.as_str()), limit], |row| {
                OutboxEntry::from_row(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn counts(&self) -> EigerResult<OutboxCounts> {
        let conn = self.db.open()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM metric_outbox GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut counts = OutboxCounts::default();
        for (status, count) in rows {
            let count = count.max(0) as u64;
            match status.parse::<OutboxStatus>() {
                Ok(OutboxStatus::Pending) => counts.pending = count,
                Ok(OutboxStatus::InProgress) => counts.in_progress = count,
                Ok(OutboxStatus::Done) => counts.done = count,
                Ok(OutboxStatus::Dead) => counts.dead = count,
                Err(message) => return Err(EigerError::Integrity(message)),
            }
        }
        Ok(counts)
    }
}

fn set_status(
    conn: &Connection,
    outbox_id: i64,
    status: OutboxStatus,
    now: DateTime<Utc>,
) -> EigerResult<()> {
    let affected = conn.execute(
        "UPDATE metric_outbox SET status = ?2, updated_at = ?3 WHERE outbox_id = ?1",
        params![outbox_id, status.as_str(), now.naive_utc()],
    )?;
    ensure_found(affected, outbox_id)
}

fn ensure_found(affected: usize, outbox_id: i64) -> EigerResult<()> {
    if affected == 0 {
        return Err(EigerError::not_found(
            EntityKind::OutboxEntry,
            outbox_id.to_string(),
        ));
    }
    Ok(())
}
