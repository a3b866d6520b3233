//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobStore trait.

use crate::batch::BatchMetrics;
use crate::state::{JobStatus, Owner};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobStore, StorageError, StorageResult};
use crate::storage::{CrawlData, JobRecord, ResultRecord};
use crate::SentinelError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared between the dispatcher, the workers and readers
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Locks shared storage, turning a poisoned lock into a storage error
pub fn lock_storage(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage
        .lock()
        .map_err(|_| StorageError::Database("storage lock poisoned".to_string()))
}

const JOB_COLUMNS: &str =
    "id, user_id, url, file_path, job_type, status, created_at, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SentinelError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SentinelError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SentinelError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Wraps the storage for sharing across tasks
    pub fn into_shared(self) -> SharedStorage {
        Arc::new(Mutex::new(self))
    }

    fn current_status(&self, job_id: i64) -> StorageResult<Option<JobStatus>> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(status.map(|s| JobStatus::from_db_string(&s).unwrap_or(JobStatus::Failed)))
    }
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        id: row.get(0)?,
        owner: Owner::from_user_id(row.get(1)?),
        url: row.get(2)?,
        batch_key: row.get(3)?,
        job_type: row.get(4)?,
        status: JobStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(JobStatus::Failed),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl JobStore for SqliteStorage {
    // ===== Job Management =====

    fn create_job(
        &mut self,
        batch_key: &str,
        owner: Owner,
        url: &str,
        job_type: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO jobs (user_id, url, file_path, job_type, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                owner.user_id(),
                url,
                batch_key,
                job_type,
                JobStatus::Pending.to_db_string(),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_job(&self, job_id: i64) -> StorageResult<JobRecord> {
        let sql = format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS);
        self.conn
            .query_row(&sql, params![job_id], job_from_row)
            .optional()?
            .ok_or(StorageError::JobNotFound(job_id))
    }

    fn update_job_status(&mut self, job_id: i64, status: JobStatus) -> StorageResult<()> {
        let predecessors = status.predecessors();

        if !predecessors.is_empty() {
            // The guard lives in SQL so concurrent writers cannot regress a job
            let allowed = predecessors
                .iter()
                .map(|s| format!("'{}'", s.to_db_string()))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status IN ({})",
                allowed
            );
            let now = Utc::now().to_rfc3339();
            let updated = self
                .conn
                .execute(&sql, params![status.to_db_string(), now, job_id])?;
            if updated == 1 {
                return Ok(());
            }
        }

        match self.current_status(job_id)? {
            Some(from) => Err(StorageError::InvalidTransition { from, to: status }),
            None => Err(StorageError::JobNotFound(job_id)),
        }
    }

    fn get_jobs_for_batch(&self, batch_key: &str) -> StorageResult<Vec<JobRecord>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE file_path = ?1 ORDER BY id ASC",
            JOB_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params![batch_key], job_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    // ===== Result Management =====

    fn insert_result(&mut self, job_id: i64, data: &CrawlData) -> StorageResult<i64> {
        let payload = serde_json::to_string(data)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO results (job_id, data, created_at) VALUES (?1, ?2, ?3)",
            params![job_id, payload, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_result_for_job(&self, job_id: i64) -> StorageResult<Option<ResultRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, job_id, data, created_at FROM results WHERE job_id = ?1",
                params![job_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, job_id, payload, created_at)) => Ok(Some(ResultRecord {
                id,
                job_id,
                data: serde_json::from_str(&payload)?,
                created_at,
            })),
            None => Ok(None),
        }
    }

    // ===== Batch Queries =====

    fn get_job_progress(&self, batch_key: &str) -> StorageResult<(u64, u64, u64)> {
        let (total, completed, failed): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = ?2 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = ?3 THEN 1 ELSE 0 END), 0)
             FROM jobs WHERE file_path = ?1",
            params![
                batch_key,
                JobStatus::Completed.to_db_string(),
                JobStatus::Failed.to_db_string()
            ],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok((total as u64, completed as u64, failed as u64))
    }

    fn get_job_results(&self, batch_key: &str) -> StorageResult<Vec<CrawlData>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.data FROM results r
             JOIN jobs j ON r.job_id = j.id
             WHERE j.file_path = ?1
             ORDER BY r.id ASC",
        )?;

        let rows = stmt.query_map(params![batch_key], |row| row.get::<_, String>(0))?;

        let mut results = Vec::new();
        for row in rows {
            let payload = row?;
            match serde_json::from_str::<CrawlData>(&payload) {
                Ok(data) => results.push(data),
                Err(e) => tracing::warn!("Skipping undecodable result in {}: {}", batch_key, e),
            }
        }

        Ok(results)
    }

    fn get_job_metrics(&self, batch_key: &str) -> StorageResult<BatchMetrics> {
        let (total_requests, avg_response_time, total_data_size): (i64, f64, i64) =
            self.conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(AVG(json_extract(r.data, '$.response_time')), 0),
                        COALESCE(SUM(LENGTH(CAST(r.data AS BLOB))), 0)
                 FROM results r
                 JOIN jobs j ON r.job_id = j.id
                 WHERE j.file_path = ?1",
                params![batch_key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let mut stmt = self.conn.prepare(
            "SELECT CAST(json_extract(r.data, '$.status_code') AS TEXT), COUNT(*)
             FROM results r
             JOIN jobs j ON r.job_id = j.id
             WHERE j.file_path = ?1
             GROUP BY 1",
        )?;
        let rows = stmt.query_map(params![batch_key], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut status_codes = BTreeMap::new();
        for row in rows {
            let (code, count) = row?;
            status_codes.insert(code, count as u64);
        }

        Ok(BatchMetrics {
            total_requests: total_requests as u64,
            avg_response_time,
            status_codes,
            total_data_size: total_data_size as u64,
        })
    }

    fn list_batches(&self, owner: Owner) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT file_path FROM jobs WHERE user_id = ?1 ORDER BY file_path DESC",
        )?;
        let batches = stmt
            .query_map(params![owner.user_id()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(batches)
    }

    fn count_batches(&self, owner: Owner) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT file_path) FROM jobs WHERE user_id = ?1",
            params![owner.user_id()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn delete_batch(&mut self, batch_key: &str, owner: Owner) -> StorageResult<u64> {
        let deleted = self.conn.execute(
            "DELETE FROM jobs WHERE file_path = ?1 AND user_id = ?2",
            params![batch_key, owner.user_id()],
        )?;
        Ok(deleted as u64)
    }
}
