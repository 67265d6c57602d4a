use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use vfi_campaign::ResultStore;
use vfi_core::errors::{ErrorInfo, VfiError};
use vfi_core::{CampaignRecord, GlitchSettings, ResultPayload};

fn store_err(code: &str, err: impl ToString) -> VfiError {
    VfiError::Store(ErrorInfo::new(code, err.to_string()))
}

fn validate_table_name(table: &str) -> Result<(), VfiError> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(VfiError::Store(
            ErrorInfo::new(
                "store.table_name",
                format!("invalid campaign table name {table:?}"),
            )
            .with_hint("use ascii letters, digits and underscores, not starting with a digit"),
        ))
    }
}

/// Sqlite-backed campaign store; one table per campaign.
pub struct SqliteStore {
    conn: Connection,
    table: String,
}

/// Row loaded back from a campaign table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAttempt {
    pub id: i64,
    pub recorded_at: String,
    pub settings: GlitchSettings,
    pub result: String,
    pub data: Vec<u8>,
    pub values: Vec<u32>,
}

impl SqliteStore {
    /// Opens (or creates) the database and campaign table. Re-opening an
    /// existing table resumes appending to it.
    pub fn open(path: &Path, table: &str) -> Result<Self, VfiError> {
        validate_table_name(table)?;
        let conn = Connection::open(path).map_err(|err| store_err("store.open", err))?;
        let store = Self {
            conn,
            table: table.to_string(),
        };
        store.init()?;
        Ok(store)
    }

    /// In-memory database, for tests and dry runs.
    pub fn open_in_memory(table: &str) -> Result<Self, VfiError> {
        validate_table_name(table)?;
        let conn = Connection::open_in_memory().map_err(|err| store_err("store.open", err))?;
        let store = Self {
            conn,
            table: table.to_string(),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), VfiError> {
        self.conn
            .execute_batch(&format!(
                "BEGIN;
                CREATE TABLE IF NOT EXISTS runtime(
                    campaign TEXT PRIMARY KEY,
                    seconds REAL NOT NULL
                );
                CREATE TABLE IF NOT EXISTS \"{table}\"(
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recorded_at TEXT NOT NULL,
                    ext_offset INTEGER NOT NULL,
                    width INTEGER NOT NULL,
                    voltage INTEGER NOT NULL,
                    prep_voltage INTEGER NOT NULL,
                    result TEXT NOT NULL,
                    data BLOB,
                    values_json TEXT
                );
                COMMIT;",
                table = self.table
            ))
            .map_err(|err| store_err("store.schema", err))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of rows already in the campaign table.
    pub fn attempt_count(&self) -> Result<u64, VfiError> {
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM \"{}\"", self.table),
                [],
                |row| row.get(0),
            )
            .map_err(|err| store_err("store.query", err))?;
        Ok(count as u64)
    }

    /// Cumulative runtime recorded for this campaign, in seconds.
    pub fn runtime_seconds(&self) -> Result<f64, VfiError> {
        let seconds: Option<f64> = self
            .conn
            .query_row(
                "SELECT seconds FROM runtime WHERE campaign = ?",
                params![self.table],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| store_err("store.query", err))?;
        Ok(seconds.unwrap_or(0.0))
    }

    /// Loads every row of the campaign table, oldest first.
    pub fn load(&self) -> Result<Vec<StoredAttempt>, VfiError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT id, recorded_at, ext_offset, width, voltage, prep_voltage, result, data, values_json
                 FROM \"{}\" ORDER BY id",
                self.table
            ))
            .map_err(|err| store_err("store.query", err))?;
        let rows = stmt
            .query_map([], |row| {
                let data: Option<Vec<u8>> = row.get(7)?;
                let values_json: Option<String> = row.get(8)?;
                Ok((
                    StoredAttempt {
                        id: row.get(0)?,
                        recorded_at: row.get(1)?,
                        settings: GlitchSettings {
                            ext_offset: row.get(2)?,
                            width: row.get(3)?,
                            voltage: row.get::<_, i64>(4)? as u8,
                            prep_voltage: row.get::<_, i64>(5)? as u8,
                        },
                        result: row.get(6)?,
                        data: data.unwrap_or_default(),
                        values: Vec::new(),
                    },
                    values_json,
                ))
            })
            .map_err(|err| store_err("store.query", err))?;

        let mut attempts = Vec::new();
        for row in rows {
            let (mut attempt, values_json) = row.map_err(|err| store_err("store.query", err))?;
            if let Some(json) = values_json {
                attempt.values = serde_json::from_str(&json)
                    .map_err(|err| store_err("store.values_json", err))?;
            }
            attempts.push(attempt);
        }
        Ok(attempts)
    }
}

impl ResultStore for SqliteStore {
    fn append(&mut self, record: &CampaignRecord) -> Result<(), VfiError> {
        let (data, values_json) = match &record.payload {
            None => (Vec::new(), None),
            Some(ResultPayload::Raw(bytes)) => (bytes.clone(), None),
            Some(ResultPayload::Words(words)) => {
                let json =
                    serde_json::to_string(words).map_err(|err| store_err("store.values_json", err))?;
                (Vec::new(), Some(json))
            }
        };
        self.conn
            .execute(
                &format!(
                    "INSERT INTO \"{}\"(recorded_at, ext_offset, width, voltage, prep_voltage, result, data, values_json)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    self.table
                ),
                params![
                    Utc::now().to_rfc3339(),
                    record.settings.ext_offset,
                    record.settings.width,
                    record.settings.voltage,
                    record.settings.prep_voltage,
                    record.result.as_str(),
                    data,
                    values_json,
                ],
            )
            .map_err(|err| store_err("store.append", err))?;
        Ok(())
    }

    fn add_runtime(&mut self, seconds: f64) -> Result<(), VfiError> {
        self.conn
            .execute(
                "INSERT INTO runtime(campaign, seconds) VALUES (?, ?)
                 ON CONFLICT(campaign) DO UPDATE SET seconds = seconds + excluded.seconds",
                params![self.table, seconds],
            )
            .map_err(|err| store_err("store.runtime", err))?;
        Ok(())
    }
}
