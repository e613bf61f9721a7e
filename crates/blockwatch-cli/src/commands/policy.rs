//! Blocklist command handlers
//!
//! Changes go through a running monitor when one answers on the socket so
//! its in-memory list updates immediately; otherwise the database is edited
//! directly and the next monitor start picks it up.
use anyhow::{bail, Result};
use blockwatch_core::{
    ipc::{IpcClient, IpcRequest, IpcResponse},
    BlockPolicyStore,
};
use blockwatch_storage::Database;
use std::{collections::BTreeMap, path::Path, sync::Arc};
use tabled::{Table, Tabled};

use super::helpers::{database_path, parse_entries, socket_path};

#[derive(Tabled)]
struct BlockedAppRow {
    #[tabled(rename = "App ID")]
    app_id: String,
    #[tabled(rename = "Name")]
    display_name: String,
}

fn open_store(data_dir: &Path) -> Result<BlockPolicyStore> {
    let db = Database::new(Some(database_path(data_dir)))?;
    Ok(BlockPolicyStore::with_persistence(Arc::new(db)))
}

/// Send a request to the running monitor, `None` when nobody is listening
async fn try_monitor(data_dir: &Path, request: IpcRequest) -> Option<IpcResponse> {
    let client = IpcClient::new(&socket_path(data_dir));
    match client.send_command(request).await {
        Ok(response) => Some(response),
        Err(e) => {
            log::debug!("Monitor not reachable, using database directly: {e}");
            None
        }
    }
}

fn expect_ok(response: IpcResponse) -> Result<()> {
    match response {
        IpcResponse::Ok => Ok(()),
        IpcResponse::Error { code, message } => bail!("{code}: {message}"),
        other => bail!("Unexpected response from monitor: {other:?}"),
    }
}

pub async fn block_apps(data_dir: &Path, raw_entries: &[String]) -> Result<()> {
    let entries = parse_entries(raw_entries)?;
    let count = entries.len();

    let request = IpcRequest::UpdateBlockedApps {
        blocked_apps: Some(entries.clone()),
    };
    match try_monitor(data_dir, request).await {
        Some(response) => expect_ok(response)?,
        None => open_store(data_dir)?.update_policy(Some(entries))?,
    }

    println!("Blocklist updated: {count} apps blocked");
    Ok(())
}

pub async fn clear_apps(data_dir: &Path) -> Result<()> {
    match try_monitor(data_dir, IpcRequest::ClearBlockedApps).await {
        Some(response) => expect_ok(response)?,
        None => open_store(data_dir)?.clear_policy()?,
    }

    println!("Blocklist cleared");
    Ok(())
}

pub async fn list_apps(data_dir: &Path) -> Result<()> {
    let list: BTreeMap<String, String> =
        match try_monitor(data_dir, IpcRequest::ListBlockedApps).await {
            Some(IpcResponse::BlockedApps(list)) => list,
            Some(other) => bail!("Unexpected response from monitor: {other:?}"),
            None => (*open_store(data_dir)?.snapshot()?).clone(),
        };

    if list.is_empty() {
        println!("No apps are blocked");
        return Ok(());
    }

    let rows: Vec<BlockedAppRow> = list
        .into_iter()
        .map(|(app_id, display_name)| BlockedAppRow {
            app_id,
            display_name,
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}
