use crate::core::normalizer;
use crate::domain::model::{
    NormalizedCode, SerialLookup, SerialRange, VerificationRecord, VerificationStatus,
};
use crate::domain::ports::{ImportSession, RangeStore};
use crate::utils::error::{Result, SerialError};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension as _, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS meta(
  k TEXT PRIMARY KEY,
  v INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS serials(
  generation INTEGER NOT NULL,
  id INTEGER NOT NULL,
  reference TEXT NOT NULL,
  description TEXT NOT NULL,
  start_serial TEXT NOT NULL,
  end_serial TEXT NOT NULL,
  issued TEXT NOT NULL,
  PRIMARY KEY (generation, id)
);
CREATE INDEX IF NOT EXISTS idx_serials_bounds ON serials(generation, start_serial, end_serial);

CREATE TABLE IF NOT EXISTS invalids(
  generation INTEGER NOT NULL,
  invalid_serial TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_invalids_serial ON invalids(generation, invalid_serial);

CREATE TABLE IF NOT EXISTS logs(
  log_name TEXT PRIMARY KEY,
  log_value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS verifications(
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  status TEXT NOT NULL,
  sender TEXT NOT NULL,
  raw_message TEXT NOT NULL,
  normalized TEXT,
  answer TEXT NOT NULL,
  ts_utc TEXT NOT NULL
);
"#;

const ACTIVE_GENERATION: &str = "active_generation";
const LAST_GENERATION: &str = "last_generation";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type RangeColumns = (i64, String, String, String, String, NaiveDate);

fn meta_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT v FROM meta WHERE k = ?1", params![key], |row| {
        row.get(0)
    })
    .optional()
}

fn active_generation(conn: &Connection) -> rusqlite::Result<i64> {
    Ok(meta_value(conn, ACTIVE_GENERATION)?.unwrap_or(0))
}

fn range_columns(row: &rusqlite::Row<'_>) -> rusqlite::Result<RangeColumns> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_range(columns: RangeColumns) -> Result<SerialRange> {
    let (id, reference, description, start, end, issued) = columns;
    Ok(SerialRange {
        id,
        reference,
        description,
        start: normalizer::restore(&start)?,
        end: normalizer::restore(&end)?,
        issued,
    })
}

/// SQLite-backed [`RangeStore`].
///
/// Every call opens its own connection and drops it before returning, so
/// concurrent checks never share a handle. Imports write into a new
/// generation that only becomes visible once it is finished.
#[derive(Debug, Clone)]
pub struct SqliteRangeStore {
    db_path: PathBuf,
}

impl SqliteRangeStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { db_path };
        let conn = store.connect()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(
            "Serial database ready at {} (journal mode {})",
            store.db_path.display(),
            mode
        );
        Ok(store)
    }

    pub fn active_generation(&self) -> Result<i64> {
        Ok(active_generation(&self.connect()?)?)
    }

    /// Runs `read` inside one read transaction, handing it the generation
    /// that was active when the snapshot was taken.
    fn read_snapshot<T>(&self, read: impl FnOnce(&Connection, i64) -> Result<T>) -> Result<T> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let generation = active_generation(&tx)?;
        let value = read(&*tx, generation)?;
        tx.commit()?;
        Ok(value)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

impl RangeStore for SqliteRangeStore {
    type Session = SqliteImportSession;

    fn begin_import(&self) -> Result<Self::Session> {
        let mut conn = self.connect()?;

        // 在寫鎖內領取新的世代編號，並行的匯入不會拿到同一號
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let active = active_generation(&tx)?;
        let issued = meta_value(&tx, LAST_GENERATION)?.unwrap_or(0);
        let generation = issued.max(active) + 1;
        tx.execute(
            "INSERT OR REPLACE INTO meta(k, v) VALUES (?1, ?2)",
            params![LAST_GENERATION, generation],
        )?;
        tx.commit()?;

        conn.execute_batch("BEGIN")?;

        tracing::info!("Import generation {} started", generation);
        Ok(SqliteImportSession { conn, generation })
    }

    fn all_ranges(&self) -> Result<Vec<SerialRange>> {
        self.read_snapshot(|conn, generation| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, reference, description, start_serial, end_serial, issued
                FROM serials
                WHERE generation = ?1
                ORDER BY id ASC
                "#,
            )?;
            let rows = stmt
                .query_map(params![generation], range_columns)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(into_range).collect()
        })
    }

    fn lookup(&self, code: &NormalizedCode) -> Result<SerialLookup> {
        self.read_snapshot(|conn, generation| {
            let blocked: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM invalids WHERE generation = ?1 AND invalid_serial = ?2)",
                params![generation, code.as_str()],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                r#"
                SELECT id, reference, description, start_serial, end_serial, issued
                FROM serials
                WHERE generation = ?1 AND start_serial <= ?2 AND ?2 <= end_serial
                ORDER BY id ASC
                "#,
            )?;
            let rows = stmt
                .query_map(params![generation, code.as_str()], range_columns)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let ranges = rows
                .into_iter()
                .map(into_range)
                .collect::<Result<Vec<_>>>()?;

            Ok(SerialLookup { blocked, ranges })
        })
    }

    fn record_verification(&self, record: &VerificationRecord) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO verifications(status, sender, raw_message, normalized, answer, ts_utc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.status.as_str(),
                record.sender,
                record.raw_message,
                record.normalized,
                record.answer,
                record.timestamp,
            ],
        )?;
        Ok(())
    }

    fn recent_verifications(&self, limit: usize) -> Result<Vec<VerificationRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT status, sender, raw_message, normalized, answer, ts_utc
            FROM verifications
            ORDER BY seq DESC
            LIMIT ?1
            "#,
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, DateTime<Utc>>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(status, sender, raw_message, normalized, answer, timestamp)| {
                let status = VerificationStatus::parse(&status).ok_or_else(|| {
                    SerialError::ProcessingError {
                        message: format!("unknown verification status '{}'", status),
                    }
                })?;
                Ok(VerificationRecord {
                    status,
                    sender,
                    raw_message,
                    normalized,
                    answer,
                    timestamp,
                })
            })
            .collect()
    }

    fn write_log(&self, name: &str, value: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR REPLACE INTO logs(log_name, log_value) VALUES (?1, ?2)",
            params![name, value],
        )?;
        Ok(())
    }

    fn read_log(&self, name: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let value = conn
            .query_row(
                "SELECT log_value FROM logs WHERE log_name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

/// Batch writer for one import generation. Dropping it without
/// [`ImportSession::finish`] leaves the previous generation active.
pub struct SqliteImportSession {
    conn: Connection,
    generation: i64,
}

impl SqliteImportSession {
    pub fn generation(&self) -> i64 {
        self.generation
    }
}

impl ImportSession for SqliteImportSession {
    fn insert_range(&mut self, range: &SerialRange) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO serials(generation, id, reference, description, start_serial, end_serial, issued)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    self.generation,
                    range.id,
                    range.reference,
                    range.description,
                    range.start.as_str(),
                    range.end.as_str(),
                    range.issued,
                ],
            )
            .map_err(|e| SerialError::ProcessingError {
                message: format!("insert serial row {}: {}", range.id, e),
            })?;
        Ok(())
    }

    fn insert_invalid(&mut self, code: &NormalizedCode) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO invalids(generation, invalid_serial) VALUES (?1, ?2)",
                params![self.generation, code.as_str()],
            )
            .map_err(|e| SerialError::ProcessingError {
                message: format!("insert invalid serial {}: {}", code, e),
            })?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            // 提交失敗時整批作廢，SQLite 不一定已自動回滾
            if !self.conn.is_autocommit() {
                self.conn.execute_batch("ROLLBACK")?;
            }
            self.conn.execute_batch("BEGIN")?;
            return Err(e.into());
        }
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let generation = self.generation;
        let mut conn = self.conn;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let active = active_generation(&tx)?;
        if generation < active {
            tx.execute(
                "DELETE FROM serials WHERE generation = ?1",
                params![generation],
            )?;
            tx.execute(
                "DELETE FROM invalids WHERE generation = ?1",
                params![generation],
            )?;
            tx.commit()?;
            tracing::warn!(
                "Import generation {} discarded, generation {} finished first",
                generation,
                active
            );
            return Err(SerialError::ProcessingError {
                message: format!(
                    "import superseded: generation {} finished before generation {}",
                    active, generation
                ),
            });
        }

        tx.execute(
            "INSERT OR REPLACE INTO meta(k, v) VALUES (?1, ?2)",
            params![ACTIVE_GENERATION, generation],
        )?;
        // 只清掉較舊的世代，之後開始的匯入不受影響
        tx.execute(
            "DELETE FROM serials WHERE generation < ?1",
            params![generation],
        )?;
        tx.execute(
            "DELETE FROM invalids WHERE generation < ?1",
            params![generation],
        )?;
        tx.commit()?;

        tracing::info!("Import generation {} is now active", generation);
        Ok(())
    }
}
