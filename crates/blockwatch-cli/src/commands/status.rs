/// Monitor lifecycle commands
use anyhow::Result;
use blockwatch_core::ipc::{IpcClient, IpcRequest, IpcResponse};
use std::path::Path;

use super::helpers::socket_path;

pub async fn show_status(data_dir: &Path) -> Result<()> {
    let client = IpcClient::new(&socket_path(data_dir));

    match client.send_command(IpcRequest::Status).await {
        Ok(IpcResponse::Status {
            monitoring_enabled,
            blocked_count,
            last_foreground_app,
            last_blocked_app,
            uptime_seconds,
        }) => {
            println!(
                "Monitoring: {}",
                if monitoring_enabled {
                    "ENABLED"
                } else {
                    "DISABLED"
                }
            );
            println!("Blocked apps: {blocked_count}");
            println!(
                "Foreground app: {}",
                last_foreground_app.as_deref().unwrap_or("-")
            );
            println!(
                "Last blocked: {}",
                last_blocked_app.as_deref().unwrap_or("-")
            );
            println!("Uptime: {uptime_seconds}s");
        }
        Ok(resp) => log::error!("Received unexpected response from monitor: {resp:?}"),
        Err(e) => {
            log::debug!("Status request failed: {e}");
            println!("Monitoring: DISABLED (monitor is not running)");
        }
    }

    Ok(())
}

pub async fn stop_monitor(data_dir: &Path) -> Result<()> {
    let client = IpcClient::new(&socket_path(data_dir));

    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => log::info!("Monitor shutdown signal sent."),
        Ok(resp) => log::error!("Received unexpected response from monitor: {resp:?}"),
        Err(e) => log::info!("Monitor is not running ({e})."),
    }

    Ok(())
}
