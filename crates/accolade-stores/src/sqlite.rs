//! SQLite-backed snapshot store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use accolade_core::error::{AccoladeError, AccoladeResult};
use accolade_core::traits::SnapshotStore;
use accolade_core::types::{
    CompletionUpdate, CriterionId, NodeId, ProgressRecord, ProgressUpdate, SubjectId,
    SubjectSnapshot, TimedChallenge,
};

/// SQLite-based snapshot store.
///
/// One row per (subject, criterion) counter, per (subject, node) completion,
/// and per open timed window. Counter upserts apply only when the incoming
/// sequence number is newer, so at-least-once delivery from the engine
/// cannot regress a stored counter.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create a new store. Pass `":memory:"` for an in-memory database.
    pub fn new(db_path: impl AsRef<Path>) -> AccoladeResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = if db_path.as_ref().to_str() == Some(":memory:") {
            Connection::open_in_memory()
        } else {
            Connection::open(db_path.as_ref())
        }
        .map_err(|e| AccoladeError::store(e.to_string()))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.create_tables()?;
        debug!(path = %db_path.as_ref().display(), "snapshot store opened");

        Ok(store)
    }

    /// Create the tables if they don't exist.
    fn create_tables(&self) -> AccoladeResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS progress (
                subject      TEXT NOT NULL,
                criterion    INTEGER NOT NULL,
                counter      INTEGER NOT NULL,
                seq          INTEGER NOT NULL,
                updated_at   TEXT NOT NULL,
                PRIMARY KEY (subject, criterion)
            );
            CREATE TABLE IF NOT EXISTS completions (
                subject      TEXT NOT NULL,
                node         INTEGER NOT NULL,
                completed_at TEXT NOT NULL,
                PRIMARY KEY (subject, node)
            );
            CREATE TABLE IF NOT EXISTS timed (
                subject      TEXT NOT NULL,
                criterion    INTEGER NOT NULL,
                started_at   TEXT NOT NULL,
                deadline     TEXT NOT NULL,
                start_asset  INTEGER NOT NULL,
                PRIMARY KEY (subject, criterion)
            );
            CREATE INDEX IF NOT EXISTS idx_progress_subject ON progress(subject);
            CREATE INDEX IF NOT EXISTS idx_completions_subject ON completions(subject);
            "#,
        )
        .map_err(|e| AccoladeError::store(e.to_string()))?;

        Ok(())
    }

    fn subject_key(subject: SubjectId) -> String {
        subject.to_string()
    }

    fn parse_timestamp(raw: &str) -> AccoladeResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| AccoladeError::store(format!("bad timestamp '{}': {}", raw, e)))
    }
}

// Counters are stored through a u64 <-> i64 bit cast: SQLite INTEGER is
// 64-bit and the value is never compared in SQL, so the round trip is exact
// for the full range.
fn to_db(counter: u64) -> i64 {
    counter as i64
}

fn from_db(raw: i64) -> u64 {
    raw as u64
}

#[async_trait]
impl SnapshotStore for SqliteStore {
    async fn load_snapshot(&self, subject: SubjectId) -> AccoladeResult<SubjectSnapshot> {
        let conn = self.conn.lock().unwrap();
        let key = Self::subject_key(subject);

        let mut stmt = conn
            .prepare("SELECT criterion, counter, seq, updated_at FROM progress WHERE subject = ?1")
            .map_err(|e| AccoladeError::store(e.to_string()))?;
        let progress = stmt
            .query_map([&key], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| AccoladeError::store(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AccoladeError::store(e.to_string()))?
            .into_iter()
            .map(|(criterion, counter, seq, updated_at)| {
                Ok(ProgressRecord {
                    criterion: CriterionId(criterion as u32),
                    counter: from_db(counter),
                    updated_at: Self::parse_timestamp(&updated_at)?,
                    last_seq: seq as u64,
                })
            })
            .collect::<AccoladeResult<Vec<_>>>()?;

        let mut stmt = conn
            .prepare("SELECT node, completed_at FROM completions WHERE subject = ?1")
            .map_err(|e| AccoladeError::store(e.to_string()))?;
        let completions = stmt
            .query_map([&key], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| AccoladeError::store(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AccoladeError::store(e.to_string()))?
            .into_iter()
            .map(|(node, completed_at)| {
                Ok((NodeId(node as u32), Self::parse_timestamp(&completed_at)?))
            })
            .collect::<AccoladeResult<Vec<_>>>()?;

        let mut stmt = conn
            .prepare(
                "SELECT criterion, started_at, deadline, start_asset FROM timed WHERE subject = ?1",
            )
            .map_err(|e| AccoladeError::store(e.to_string()))?;
        let timed = stmt
            .query_map([&key], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(|e| AccoladeError::store(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AccoladeError::store(e.to_string()))?
            .into_iter()
            .map(|(criterion, started_at, deadline, start_asset)| {
                Ok(TimedChallenge {
                    criterion: CriterionId(criterion as u32),
                    started_at: Self::parse_timestamp(&started_at)?,
                    deadline: Self::parse_timestamp(&deadline)?,
                    start_asset: from_db(start_asset),
                })
            })
            .collect::<AccoladeResult<Vec<_>>>()?;

        Ok(SubjectSnapshot {
            progress,
            completions,
            timed,
        })
    }

    async fn upsert_progress(&self, updates: &[ProgressUpdate]) -> AccoladeResult<()> {
        let conn = self.conn.lock().unwrap();
        for update in updates {
            conn.execute(
                r#"
                INSERT INTO progress (subject, criterion, counter, seq, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (subject, criterion) DO UPDATE SET
                    counter = excluded.counter,
                    seq = excluded.seq,
                    updated_at = excluded.updated_at
                WHERE excluded.seq > progress.seq
                "#,
                params![
                    Self::subject_key(update.subject),
                    update.criterion.0 as i64,
                    to_db(update.counter),
                    update.seq as i64,
                    update.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| AccoladeError::store(e.to_string()))?;
        }
        Ok(())
    }

    async fn upsert_completions(&self, updates: &[CompletionUpdate]) -> AccoladeResult<()> {
        let conn = self.conn.lock().unwrap();
        for update in updates {
            match update.completed_at {
                Some(at) => {
                    conn.execute(
                        r#"
                        INSERT OR REPLACE INTO completions (subject, node, completed_at)
                        VALUES (?1, ?2, ?3)
                        "#,
                        params![
                            Self::subject_key(update.subject),
                            update.node.0 as i64,
                            at.to_rfc3339(),
                        ],
                    )
                    .map_err(|e| AccoladeError::store(e.to_string()))?;
                }
                None => {
                    conn.execute(
                        "DELETE FROM completions WHERE subject = ?1 AND node = ?2",
                        params![Self::subject_key(update.subject), update.node.0 as i64],
                    )
                    .map_err(|e| AccoladeError::store(e.to_string()))?;
                }
            }
        }
        Ok(())
    }

    async fn save_timed(
        &self,
        subject: SubjectId,
        challenges: &[TimedChallenge],
    ) -> AccoladeResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let key = Self::subject_key(subject);

        let tx = conn
            .transaction()
            .map_err(|e| AccoladeError::store(e.to_string()))?;
        tx.execute("DELETE FROM timed WHERE subject = ?1", [&key])
            .map_err(|e| AccoladeError::store(e.to_string()))?;
        for challenge in challenges {
            tx.execute(
                r#"
                INSERT INTO timed (subject, criterion, started_at, deadline, start_asset)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    key,
                    challenge.criterion.0 as i64,
                    challenge.started_at.to_rfc3339(),
                    challenge.deadline.to_rfc3339(),
                    to_db(challenge.start_asset),
                ],
            )
            .map_err(|e| AccoladeError::store(e.to_string()))?;
        }
        tx.commit().map_err(|e| AccoladeError::store(e.to_string()))?;

        Ok(())
    }

    async fn clear_subject(&self, subject: SubjectId) -> AccoladeResult<()> {
        let conn = self.conn.lock().unwrap();
        let key = Self::subject_key(subject);
        conn.execute("DELETE FROM progress WHERE subject = ?1", [&key])
            .map_err(|e| AccoladeError::store(e.to_string()))?;
        conn.execute("DELETE FROM completions WHERE subject = ?1", [&key])
            .map_err(|e| AccoladeError::store(e.to_string()))?;
        conn.execute("DELETE FROM timed WHERE subject = ?1", [&key])
            .map_err(|e| AccoladeError::store(e.to_string()))?;
        Ok(())
    }
}
