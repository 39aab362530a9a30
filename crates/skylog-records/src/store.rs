//! SQLite-backed weather record storage.
//!
//! Every operation opens its own connection and drops it before returning,
//! so nothing is held between calls. Storage faults never escape: they are
//! logged and turned into `false`, an empty list or `0`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use skylog_core::{DatabaseError, RusqliteErrorExt};

use crate::record::{NewRecord, RecordKey, WeatherRecord, DATE_FORMAT};

const SCHEMA_VERSION: i32 = 1;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "SELECT location, date, temperature, wind_speed, wind_direction, forecast, created_at
     FROM weather_records";

type StoreResult<T> = Result<T, DatabaseError>;

/// Durable record storage keyed by `(location, date)`.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    ready: AtomicBool,
}

impl RecordStore {
    /// Create a store for the given database file without touching it.
    ///
    /// Call [`initialize`](Self::initialize) before use.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ready: AtomicBool::new(false),
        }
    }

    /// Create and initialize in one step. Check [`is_ready`](Self::is_ready) afterwards.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let store = Self::new(path);
        store.initialize();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once the schema exists and the file could be opened
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Ensure the database file and schema exist. Safe to call on every start.
    ///
    /// On failure the store stays unusable and every other operation reports
    /// failure without touching storage.
    pub fn initialize(&self) -> bool {
        match self.init_schema() {
            Ok(()) => {
                self.ready.store(true, Ordering::Release);
                tracing::info!("Record store initialized at {}", self.path.display());
                true
            }
            Err(e) => {
                self.ready.store(false, Ordering::Release);
                tracing::error!(
                    "Error initializing record store at {}: {}",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }

    /// Insert a record, or replace every non-key field of the existing one.
    ///
    /// `created_at` is refreshed either way.
    pub fn save(&self, record: &NewRecord) -> bool {
        match self.try_save(record) {
            Ok(()) => {
                tracing::info!("Weather record saved: {}", record.key());
                true
            }
            Err(e) => {
                tracing::error!("Error saving weather record {}: {}", record.key(), e);
                false
            }
        }
    }

    /// All records, newest date first, then by location.
    pub fn list_all(&self) -> Vec<WeatherRecord> {
        self.try_list_all().unwrap_or_else(|e| {
            tracing::error!("Error retrieving records: {}", e);
            Vec::new()
        })
    }

    /// Records whose location contains `substring` anywhere (ASCII case-insensitive),
    /// in the same order as [`list_all`](Self::list_all).
    pub fn list_by_location(&self, substring: &str) -> Vec<WeatherRecord> {
        self.try_list_by_location(substring).unwrap_or_else(|e| {
            tracing::error!("Error retrieving records by location '{}': {}", substring, e);
            Vec::new()
        })
    }

    /// The record at exactly this key, if any.
    pub fn get(&self, key: &RecordKey) -> Option<WeatherRecord> {
        self.try_get(key).unwrap_or_else(|e| {
            tracing::error!("Error retrieving record {}: {}", key, e);
            None
        })
    }

    /// Remove the record at this key. Returns `false` if nothing matched.
    pub fn delete(&self, key: &RecordKey) -> bool {
        match self.try_delete(key) {
            Ok(true) => {
                tracing::info!("Deleted record: {}", key);
                true
            }
            Ok(false) => {
                tracing::warn!("No record found to delete: {}", key);
                false
            }
            Err(e) => {
                tracing::error!("Error deleting record {}: {}", key, e);
                false
            }
        }
    }

    pub fn count(&self) -> usize {
        self.try_count().unwrap_or_else(|e| {
            tracing::error!("Error getting record count: {}", e);
            0
        })
    }

    fn connect(&self) -> StoreResult<Connection> {
        if !self.is_ready() {
            return Err(DatabaseError::Unavailable);
        }
        open_connection(&self.path)
    }

    fn init_schema(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
            }
        }

        let conn = open_connection(&self.path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);

            CREATE TABLE IF NOT EXISTS weather_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL,
                date TEXT NOT NULL,
                temperature INTEGER NOT NULL,
                wind_speed TEXT NOT NULL,
                wind_direction TEXT NOT NULL,
                forecast TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(location, date)
            );

            CREATE INDEX IF NOT EXISTS idx_weather_records_date
                ON weather_records(date DESC, location ASC);
            "#,
        )
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()
            .map_err(RusqliteErrorExt::into_database_error)?;

        if version.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(RusqliteErrorExt::into_database_error)?;
        }

        Ok(())
    }

    fn try_save(&self, record: &NewRecord) -> StoreResult<()> {
        if record.location.trim().is_empty() {
            return Err(DatabaseError::InvalidRecord(
                "location cannot be empty".to_string(),
            ));
        }

        let conn = self.connect()?;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        // One statement, so the unique key is never violated mid-write
        conn.execute(
            r#"
            INSERT INTO weather_records
                (location, date, temperature, wind_speed, wind_direction, forecast, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(location, date) DO UPDATE SET
                temperature = excluded.temperature,
                wind_speed = excluded.wind_speed,
                wind_direction = excluded.wind_direction,
                forecast = excluded.forecast,
                created_at = excluded.created_at
            "#,
            params![
                record.location,
                record.date.format(DATE_FORMAT).to_string(),
                record.temperature,
                record.wind_speed,
                record.wind_direction,
                record.forecast,
                created_at,
            ],
        )
        .map_err(RusqliteErrorExt::into_database_error)?;

        Ok(())
    }

    fn try_list_all(&self) -> StoreResult<Vec<WeatherRecord>> {
        let conn = self.connect()?;
        let sql = format!("{} ORDER BY date DESC, location ASC", SELECT_COLUMNS);
        query_records(&conn, &sql, [])
    }

    fn try_list_by_location(&self, substring: &str) -> StoreResult<Vec<WeatherRecord>> {
        let conn = self.connect()?;
        let sql = format!(
            "{} WHERE location LIKE ?1 ESCAPE '\\' ORDER BY date DESC, location ASC",
            SELECT_COLUMNS
        );
        let pattern = format!("%{}%", escape_like(substring));
        query_records(&conn, &sql, params![pattern])
    }

    fn try_get(&self, key: &RecordKey) -> StoreResult<Option<WeatherRecord>> {
        let conn = self.connect()?;
        let sql = format!("{} WHERE location = ?1 AND date = ?2", SELECT_COLUMNS);
        let records = query_records(
            &conn,
            &sql,
            params![key.location, key.date.format(DATE_FORMAT).to_string()],
        )?;
        Ok(records.into_iter().next())
    }

    fn try_delete(&self, key: &RecordKey) -> StoreResult<bool> {
        let conn = self.connect()?;
        let affected = conn
            .execute(
                "DELETE FROM weather_records WHERE location = ?1 AND date = ?2",
                params![key.location, key.date.format(DATE_FORMAT).to_string()],
            )
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(affected > 0)
    }

    fn try_count(&self) -> StoreResult<usize> {
        let conn = self.connect()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM weather_records", [], |row| row.get(0))
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn open_connection(path: &Path) -> StoreResult<Connection> {
    let conn = Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(RusqliteErrorExt::into_database_error)?;
    Ok(conn)
}

fn query_records<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<WeatherRecord>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(RusqliteErrorExt::into_database_error)?;

    let rows = stmt
        .query_map(params, row_to_record)
        .map_err(RusqliteErrorExt::into_database_error)?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(RusqliteErrorExt::into_database_error)
}

/// Convert a database row to a WeatherRecord.
fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<WeatherRecord> {
    let location: String = row.get(0)?;
    let date_str: String = row.get(1)?;
    let temperature: i32 = row.get(2)?;
    let wind_speed: String = row.get(3)?;
    let wind_direction: String = row.get(4)?;
    let forecast: Option<String> = row.get(5)?;
    let created_at_str: String = row.get(6)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(WeatherRecord {
        location,
        date,
        temperature,
        wind_speed,
        wind_direction,
        forecast: forecast.unwrap_or_default(),
        created_at: parse_timestamp(&created_at_str)?,
    })
}

/// RFC 3339, or SQLite's `CURRENT_TIMESTAMP` form from older databases.
fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Escape LIKE wildcards so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
