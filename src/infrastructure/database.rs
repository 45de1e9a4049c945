use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{DecideAction, FileMeta, Record, RecordStatus};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found")]
    NotFound,

    #[error("Record id already exists")]
    AlreadyExists,

    #[error("Record already decided")]
    AlreadyDecided,

    #[error("File metadata encoding failed: {0}")]
    Meta(String),
}

/// Counts per status, plus the overall total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub verified: usize,
    pub rejected: usize,
}

/// Keyed persistence for records.
///
/// `create` must fail on an existing id rather than overwrite, and `decide`
/// must be atomic per id: of two concurrent decisions on the same pending
/// record, exactly one may win.
pub trait RecordStore: Send {
    fn create(&self, record: &Record) -> Result<(), StoreError>;
    fn get(&self, id: &str) -> Result<Record, StoreError>;
    fn decide(
        &self,
        id: &str,
        action: DecideAction,
        decided_by: &str,
        attestation_id: Option<&str>,
    ) -> Result<Record, StoreError>;
    fn list_by_holder(
        &self,
        holder_ref: &str,
        status: Option<RecordStatus>,
    ) -> Result<Vec<Record>, StoreError>;
    fn count_by_status(&self) -> Result<StatusCounts, StoreError>;
}

const RECORD_COLUMNS: &str = "id, patient_ref, holder_ref, fingerprint, attestation_id, \
                              status, created_at, decided_at, decided_by, file_meta";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self { conn })
    }

    fn init(conn: &Connection) -> Result<(), StoreError> {
        // Concurrent writers queue on the busy handler instead of erroring,
        // so the decide compare-and-set resolves to one winner and one loser.
        conn.busy_timeout(Duration::from_secs(5))?;

        // No UNIQUE constraint on fingerprint: identical uploads must carry
        // identical fingerprints across distinct records.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                patient_ref TEXT NOT NULL,
                holder_ref TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                attestation_id TEXT,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                decided_at INTEGER,
                decided_by TEXT,
                file_meta TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_holder_ref ON records(holder_ref)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_created_at ON records(created_at)",
            [],
        )?;

        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<Record, rusqlite::Error> {
        let status_raw: String = row.get(5)?;
        let status = RecordStatus::parse(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                format!("unknown status '{}'", status_raw).into(),
            )
        })?;

        let meta_raw: String = row.get(9)?;
        let files: Vec<FileMeta> = serde_json::from_str(&meta_raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Record {
            id: row.get(0)?,
            patient_ref: row.get(1)?,
            holder_ref: row.get(2)?,
            fingerprint: row.get(3)?,
            attestation_id: row.get(4)?,
            status,
            created_at: row.get(6)?,
            decided_at: row.get(7)?,
            decided_by: row.get(8)?,
            files,
        })
    }
}

impl RecordStore for SqliteStore {
    fn create(&self, record: &Record) -> Result<(), StoreError> {
        let file_meta =
            serde_json::to_string(&record.files).map_err(|e| StoreError::Meta(e.to_string()))?;

        match self.conn.execute(
            "INSERT INTO records (id, patient_ref, holder_ref, fingerprint, attestation_id,
                                  status, created_at, decided_at, decided_by, file_meta)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &record.id,
                &record.patient_ref,
                &record.holder_ref,
                &record.fingerprint,
                &record.attestation_id,
                record.status.as_str(),
                record.created_at,
                record.decided_at,
                &record.decided_by,
                &file_meta,
            ],
        ) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, msg)) => {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    Err(StoreError::AlreadyExists)
                } else {
                    Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, msg)))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: &str) -> Result<Record, StoreError> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()?;

        record.ok_or(StoreError::NotFound)
    }

    fn decide(
        &self,
        id: &str,
        action: DecideAction,
        decided_by: &str,
        attestation_id: Option<&str>,
    ) -> Result<Record, StoreError> {
        let decided_at = chrono::Utc::now().timestamp();

        // Compare-and-set: the transition applies only while the record is
        // still pending, so concurrent decisions cannot both win.
        let changed = self.conn.execute(
            "UPDATE records
             SET status = ?2, decided_at = ?3, decided_by = ?4,
                 attestation_id = COALESCE(?5, attestation_id)
             WHERE id = ?1 AND status = ?6",
            params![
                id,
                action.target_status().as_str(),
                decided_at,
                decided_by,
                attestation_id,
                RecordStatus::Pending.as_str(),
            ],
        )?;

        if changed == 0 {
            // Lost the race, or the id never existed; the read tells us which.
            return match self.get(id) {
                Ok(_) => Err(StoreError::AlreadyDecided),
                Err(e) => Err(e),
            };
        }

        self.get(id)
    }

    fn list_by_holder(
        &self,
        holder_ref: &str,
        status: Option<RecordStatus>,
    ) -> Result<Vec<Record>, StoreError> {
        let mut records = Vec::new();

        match status {
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM records WHERE holder_ref = ?1
                     ORDER BY created_at DESC, id DESC",
                    RECORD_COLUMNS
                ))?;
                let rows = stmt.query_map(params![holder_ref], Self::row_to_record)?;
                for row in rows {
                    records.push(row?);
                }
            }
            Some(status) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM records WHERE holder_ref = ?1 AND status = ?2
                     ORDER BY created_at DESC, id DESC",
                    RECORD_COLUMNS
                ))?;
                let rows =
                    stmt.query_map(params![holder_ref, status.as_str()], Self::row_to_record)?;
                for row in rows {
                    records.push(row?);
                }
            }
        }

        Ok(records)
    }

    fn count_by_status(&self) -> Result<StatusCounts, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM records GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (status, n) = row?;
            let n = n as usize;
            counts.total += n;
            match RecordStatus::parse(&status) {
                Some(RecordStatus::Pending) => counts.pending += n,
                Some(RecordStatus::Verified) => counts.verified += n,
                Some(RecordStatus::Rejected) => counts.rejected += n,
                None => {}
            }
        }

        Ok(counts)
    }
}
