//! Database operations split into domain-specific modules.
//!
//! This module exposes the `Database` handle and namespace-wide operations;
//! the blocklist layout lives in `blocklist`.

mod blocklist;

pub use blocklist::{APP_NAME_PREFIX, BLOCKED_APPS_KEY, POLICY_NAMESPACE};

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::migrations;

/// Database connection wrapper
///
/// The connection sits behind a mutex so one handle can be shared between
/// the monitor loop and the policy control channel.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new database connection
    ///
    /// # Errors
    ///
    /// Returns an error if database directory creation, connection opening, or schema initialization fails
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_db_path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&path).context("Failed to open database connection")?;
        migrations::init_schema(&conn)?;

        log::info!("Database initialized at: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get default database path
    fn default_db_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("blockwatch");
        path.push("blockwatch.db");
        path
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection mutex poisoned"))
    }

    // ==================== Key-Value Methods ====================

    /// Read a single value from a namespace
    #[cfg(test)]
    pub(crate) fn get_value(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;

        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE namespace = ?1 AND key = ?2",
                rusqlite::params![namespace, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or overwrite a single value in a namespace
    #[cfg(test)]
    pub(crate) fn put_value(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_store (namespace, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            rusqlite::params![namespace, key, value],
        )?;
        Ok(())
    }

    /// Remove every key of a namespace
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub fn clear_namespace(&self, namespace: &str) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM kv_store WHERE namespace = ?1", [namespace])?;
        Ok(removed)
    }
}
