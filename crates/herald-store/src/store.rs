use std::sync::Mutex;

use rusqlite::Connection;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::types::EchoJob;

/// Settings key holding a guild's echo job definition list.
pub const JOBS_KEY: &str = "jobs";

/// Scope id for process-global settings in the guild settings table.
pub const GLOBAL_SCOPE: &str = "*";

/// Thread-safe per-guild key-value settings store.
///
/// Wraps a single SQLite connection in a `Mutex`; values are JSON documents.
/// A Mutex is sufficient for the single-node deployment target.
pub struct GuildStore {
    db: Mutex<Connection>,
}

impl GuildStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Read one setting, `None` when it has never been written.
    pub fn get(&self, guild_id: &str, key: &str) -> Result<Option<Value>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT value FROM guild_settings WHERE guild_id = ?1 AND key = ?2",
            rusqlite::params![guild_id, key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Write one setting, overwriting any previous value.
    pub fn set(&self, guild_id: &str, key: &str, value: &Value) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO guild_settings (guild_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (guild_id, key) DO UPDATE SET value = excluded.value",
            rusqlite::params![guild_id, key, raw],
        )?;
        Ok(())
    }

    /// Write one setting only when it is not already set.
    ///
    /// Idempotent: repeated calls never overwrite an existing value.
    pub fn set_default(&self, guild_id: &str, key: &str, value: &Value) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        let db = self.db.lock().unwrap();
        let inserted = db.execute(
            "INSERT OR IGNORE INTO guild_settings (guild_id, key, value) VALUES (?1, ?2, ?3)",
            rusqlite::params![guild_id, key, raw],
        )?;
        if inserted > 0 {
            debug!(guild_id = %guild_id, key = %key, "default setting installed");
        }
        Ok(())
    }

    /// The guild's job definition list, empty when none are persisted.
    pub fn jobs(&self, guild_id: &str) -> Result<Vec<EchoJob>> {
        match self.get(guild_id, JOBS_KEY)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace the guild's job definition list.
    pub fn set_jobs(&self, guild_id: &str, jobs: &[EchoJob]) -> Result<()> {
        self.set(guild_id, JOBS_KEY, &serde_json::to_value(jobs)?)
    }

    /// All guild ids with at least one stored setting, global scope excluded.
    pub fn guild_ids(&self) -> Result<Vec<String>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT DISTINCT guild_id FROM guild_settings WHERE guild_id != ?1 ORDER BY guild_id",
        )?;
        let ids = stmt
            .query_map([GLOBAL_SCOPE], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }
}
