//! Helper utility functions for CLI commands

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const SOCKET_FILE_NAME: &str = "blockwatch.sock";
pub const DATABASE_FILE_NAME: &str = "blockwatch.db";

pub fn socket_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SOCKET_FILE_NAME)
}

pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE_NAME)
}

/// Parse `app_id=Display Name` arguments into a blocklist map
///
/// A missing `=` or empty name leaves the name empty; the store substitutes
/// its fallback name.
pub fn parse_entries(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut entries = HashMap::new();
    for item in raw {
        let (app_id, name) = item.split_once('=').unwrap_or((item.as_str(), ""));
        let app_id = app_id.trim();
        if app_id.is_empty() {
            bail!("Invalid entry '{item}': app identifier is empty");
        }
        entries.insert(app_id.to_string(), name.trim().to_string());
    }
    Ok(entries)
}
