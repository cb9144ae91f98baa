/*!
 * Durable job store backed by SQLite.
 *
 * The store is the single piece of state shared across workers: it owns job
 * rows, serializes claim operations so no two workers ever run the same job,
 * and survives process restarts so in-flight jobs are recoverable.
 */

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, TransactionBehavior};
use uuid::Uuid;

use crate::errors::QueueError;
use crate::queue::models::{Job, JobPayload, JobStatus};

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "kalque.db";

/// Default database directory name under the user's data directory
const DEFAULT_DB_DIRNAME: &str = "kalque";

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Thread-safe handle to the jobs database
#[derive(Clone)]
pub struct JobStore {
    /// Path to the database file
    db_path: PathBuf,
    /// Shared connection, serialized by mutex
    connection: Arc<Mutex<Connection>>,
}

impl JobStore {
    /// Open the store at the default location
    pub fn new_default() -> Result<Self, QueueError> {
        let db_path = Self::default_database_path()?;
        Self::new(&db_path)
    }

    /// Open (or create) the store at the given path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, QueueError> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| QueueError::Store(format!("failed to create db directory: {e}")))?;
        }

        info!("Opening job store at: {:?}", db_path);

        let conn = Connection::open(&db_path)?;
        initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing)
    pub fn new_in_memory() -> Result<Self, QueueError> {
        debug!("Creating in-memory job store");

        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Default database path under the user's data directory
    pub fn default_database_path() -> Result<PathBuf, QueueError> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| QueueError::Store("could not determine data directory".to_string()))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    /// Path of the backing database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run a store operation on the blocking pool
    async fn execute_async<F, T>(&self, f: F) -> Result<T, QueueError>
    where
        F: FnOnce(&mut Connection) -> Result<T, QueueError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| QueueError::Store(format!("failed to acquire db lock: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| QueueError::Store(format!("db task panicked: {e}")))?
    }

    /// Enqueue a new job, returning its id immediately.
    ///
    /// The job starts in `queued` state; processing happens whenever a worker
    /// claims it.
    pub async fn submit(&self, payload: JobPayload) -> Result<String, QueueError> {
        let job_id = Uuid::new_v4().to_string();
        let payload_json = serde_json::to_string(&payload)
            .map_err(|e| QueueError::Payload(e.to_string()))?;
        let now = Utc::now();
        let id_for_insert = job_id.clone();

        self.execute_async(move |conn| {
            conn.execute(
                "INSERT INTO jobs (id, payload, status, attempts, progress, available_at_ms, created_at, updated_at)
                 VALUES (?1, ?2, 'queued', 0, 'queued', ?3, ?4, ?4)",
                params![
                    id_for_insert,
                    payload_json,
                    now.timestamp_millis(),
                    now.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;

        info!("Job {} submitted", &job_id[..8]);
        Ok(job_id)
    }

    /// Claim the oldest due queued job, transitioning it to `active`.
    ///
    /// Runs inside an immediate transaction so concurrent workers can never
    /// claim the same job. The claim counts as the start of an attempt.
    pub async fn claim(&self) -> Result<Option<Job>, QueueError> {
        self.execute_async(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = Utc::now();

            let candidate: Option<String> = tx
                .query_row(
                    "SELECT id FROM jobs
                     WHERE status = 'queued' AND available_at_ms <= ?1
                     ORDER BY created_at LIMIT 1",
                    params![now.timestamp_millis()],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;

            let Some(job_id) = candidate else {
                tx.commit()?;
                return Ok(None);
            };

            tx.execute(
                "UPDATE jobs SET status = 'active', attempts = attempts + 1, updated_at = ?2
                 WHERE id = ?1",
                params![job_id, now.to_rfc3339()],
            )?;

            let job = read_job(&tx, &job_id)?;
            tx.commit()?;

            Ok(Some(job))
        })
        .await
    }

    /// Fetch a job by id
    pub async fn get(&self, job_id: &str) -> Result<Job, QueueError> {
        let job_id = job_id.to_string();
        self.execute_async(move |conn| read_job(conn, &job_id)).await
    }

    /// Update the job's human-readable stage label
    pub async fn update_progress(&self, job_id: &str, stage: &str) -> Result<(), QueueError> {
        let job_id = job_id.to_string();
        let stage = stage.to_string();

        self.execute_async(move |conn| {
            conn.execute(
                "UPDATE jobs SET progress = ?2, updated_at = ?3 WHERE id = ?1",
                params![job_id, stage, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    /// Return a failed attempt to the queue with a backoff gate
    pub async fn requeue(
        &self,
        job_id: &str,
        error: &str,
        available_at: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let job_id = job_id.to_string();
        let error = error.to_string();

        self.execute_async(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = 'queued', last_error = ?2, available_at_ms = ?3, updated_at = ?4
                 WHERE id = ?1",
                params![
                    job_id,
                    error,
                    available_at.timestamp_millis(),
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Mark a job terminally failed
    pub async fn mark_failed(&self, job_id: &str, error: &str) -> Result<(), QueueError> {
        let job_id = job_id.to_string();
        let error = error.to_string();

        self.execute_async(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = 'failed', last_error = ?2, progress = 'failed', updated_at = ?3
                 WHERE id = ?1",
                params![job_id, error, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    /// Mark a job completed and store its rendered result
    pub async fn mark_completed(&self, job_id: &str, result: &str) -> Result<(), QueueError> {
        let job_id = job_id.to_string();
        let result = result.to_string();

        self.execute_async(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = 'completed', result = ?2, progress = 'completed', updated_at = ?3
                 WHERE id = ?1",
                params![job_id, result, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    /// Recover jobs left `active` by a previous process.
    ///
    /// Called once at startup, before workers spin up. Interrupted jobs go
    /// back to `queued` and re-run from scratch on their next claim.
    pub async fn recover_interrupted(&self) -> Result<usize, QueueError> {
        let recovered = self
            .execute_async(move |conn| {
                let changed = conn.execute(
                    "UPDATE jobs SET status = 'queued', updated_at = ?1 WHERE status = 'active'",
                    params![Utc::now().to_rfc3339()],
                )?;
                Ok(changed)
            })
            .await?;

        if recovered > 0 {
            info!("Recovered {} interrupted job(s) back to queued", recovered);
        }

        Ok(recovered)
    }

    /// List the most recent jobs, newest first
    pub async fn list(&self, limit: usize) -> Result<Vec<Job>, QueueError> {
        self.execute_async(move |conn| {
            let ids: Vec<String> = {
                let mut stmt =
                    conn.prepare("SELECT id FROM jobs ORDER BY created_at DESC LIMIT ?1")?;
                let rows = stmt.query_map(params![limit as i64], |row| row.get(0))?;
                rows.collect::<Result<_, _>>()?
            };

            ids.iter().map(|id| read_job(conn, id)).collect()
        })
        .await
    }
}

/// Initialize schema, creating tables on first open
fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            progress TEXT NOT NULL DEFAULT 'queued',
            result TEXT,
            available_at_ms INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
        CREATE INDEX IF NOT EXISTS idx_jobs_claim ON jobs(status, available_at_ms, created_at);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        params![SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Read one job row by id
fn read_job(conn: &Connection, job_id: &str) -> Result<Job, QueueError> {
    let row = conn
        .query_row(
            "SELECT id, payload, status, attempts, last_error, progress, result, created_at, updated_at
             FROM jobs WHERE id = ?1",
            params![job_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => QueueError::UnknownJob(job_id.to_string()),
            other => QueueError::Store(other.to_string()),
        })?;

    let (id, payload_json, status, attempts, last_error, progress, result, created_at, updated_at) =
        row;

    let payload: JobPayload = serde_json::from_str(&payload_json)
        .map_err(|e| QueueError::Payload(e.to_string()))?;
    let status: JobStatus = status
        .parse()
        .map_err(|e: anyhow::Error| QueueError::Store(e.to_string()))?;

    Ok(Job {
        id,
        payload,
        status,
        attempts: attempts as u32,
        last_error,
        progress,
        result,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Parse a stored RFC 3339 timestamp
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, QueueError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| QueueError::Store(format!("invalid stored timestamp {raw}: {e}")))
}
