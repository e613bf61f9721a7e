//! Blocklist persistence on top of the namespaced key-value store.
//!
//! Layout inside `POLICY_NAMESPACE`:
//! - `blocked_apps` holds a JSON array with every blocked app identifier
//! - `app_name_<app id>` holds the display name for that identifier

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;

use super::Database;

pub const POLICY_NAMESPACE: &str = "blockwatch_limits";
pub const BLOCKED_APPS_KEY: &str = "blocked_apps";
pub const APP_NAME_PREFIX: &str = "app_name_";

impl Database {
    /// Replace the persisted blocklist with `entries` in a single transaction
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any statement fails; the previous
    /// blocklist is kept in that case
    pub fn replace_blocklist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let keys: Vec<&String> = entries.keys().collect();
        let encoded = serde_json::to_string(&keys).context("Failed to encode blocked app set")?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM kv_store WHERE namespace = ?1",
            [POLICY_NAMESPACE],
        )?;
        tx.execute(
            "INSERT INTO kv_store (namespace, key, value) VALUES (?1, ?2, ?3)",
            params![POLICY_NAMESPACE, BLOCKED_APPS_KEY, encoded],
        )?;
        for (app_id, display_name) in entries {
            tx.execute(
                "INSERT INTO kv_store (namespace, key, value) VALUES (?1, ?2, ?3)",
                params![
                    POLICY_NAMESPACE,
                    format!("{APP_NAME_PREFIX}{app_id}"),
                    display_name
                ],
            )?;
        }
        tx.commit()?;

        log::debug!("Persisted blocklist with {} entries", entries.len());
        Ok(())
    }

    /// Load the persisted blocklist
    ///
    /// A key whose display-name row is missing maps to `None`, the caller
    /// decides on the fallback name.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or the stored key set is not valid JSON
    pub fn load_blocklist(&self) -> Result<BTreeMap<String, Option<String>>> {
        let conn = self.lock()?;
        let encoded: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_store WHERE namespace = ?1 AND key = ?2",
                params![POLICY_NAMESPACE, BLOCKED_APPS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let Some(encoded) = encoded else {
            return Ok(BTreeMap::new());
        };
        let keys: Vec<String> =
            serde_json::from_str(&encoded).context("Stored blocked app set is corrupt")?;

        let mut stmt =
            conn.prepare("SELECT value FROM kv_store WHERE namespace = ?1 AND key = ?2")?;
        let mut entries = BTreeMap::new();
        for app_id in keys {
            let name: Option<String> = stmt
                .query_row(
                    params![POLICY_NAMESPACE, format!("{APP_NAME_PREFIX}{app_id}")],
                    |row| row.get(0),
                )
                .optional()?;
            entries.insert(app_id, name);
        }
        Ok(entries)
    }

    /// Remove the persisted blocklist
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub fn clear_blocklist(&self) -> Result<()> {
        let removed = self.clear_namespace(POLICY_NAMESPACE)?;
        log::debug!("Cleared persisted blocklist ({removed} rows)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(Some(dir.path().join("blocklist.db"))).unwrap();
        (dir, db)
    }

    fn entries(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_load_empty_when_nothing_stored() {
        let (_dir, db) = open_temp();
        assert!(db.load_blocklist().unwrap().is_empty());
    }

    #[test]
    fn test_replace_then_load() {
        let (_dir, db) = open_temp();
        db.replace_blocklist(&entries(&[("com.game", "GameApp"), ("com.video", "Tube")]))
            .unwrap();

        let loaded = db.load_blocklist().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["com.game"].as_deref(), Some("GameApp"));
        assert_eq!(loaded["com.video"].as_deref(), Some("Tube"));
    }

    #[test]
    fn test_replace_drops_stale_names() {
        let (_dir, db) = open_temp();
        db.replace_blocklist(&entries(&[("com.old", "Old")])).unwrap();
        db.replace_blocklist(&entries(&[("com.new", "New")])).unwrap();

        let loaded = db.load_blocklist().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!loaded.contains_key("com.old"));
        assert!(db
            .get_value(POLICY_NAMESPACE, "app_name_com.old")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_missing_name_row_loads_as_none() {
        let (_dir, db) = open_temp();
        db.put_value(POLICY_NAMESPACE, BLOCKED_APPS_KEY, r#"["com.nameless"]"#)
            .unwrap();

        let loaded = db.load_blocklist().unwrap();
        assert_eq!(loaded.get("com.nameless"), Some(&None));
    }

    #[test]
    fn test_corrupt_key_set_is_an_error() {
        let (_dir, db) = open_temp();
        db.put_value(POLICY_NAMESPACE, BLOCKED_APPS_KEY, "not json")
            .unwrap();
        assert!(db.load_blocklist().is_err());
    }

    #[test]
    fn test_clear_blocklist() {
        let (_dir, db) = open_temp();
        db.replace_blocklist(&entries(&[("com.game", "GameApp")]))
            .unwrap();
        db.clear_blocklist().unwrap();
        assert!(db.load_blocklist().unwrap().is_empty());
    }
}
