use anyhow::Result;
use rusqlite::Connection;

/// Initialize database schema
///
/// # Errors
///
/// Returns an error if table or index creation fails
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Namespaced key-value store - one row per (namespace, key)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            namespace TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (namespace, key)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_kv_store_namespace ON kv_store(namespace)",
        [],
    )?;

    Ok(())
}
