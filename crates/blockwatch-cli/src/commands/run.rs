/// Foreground monitor command: stdin event feed plus console-backed device
use anyhow::{Context, Result};
use async_trait::async_trait;
use blockwatch_core::{
    config::MonitorConfig,
    engine::RedirectPayload,
    event::now_millis,
    BlockError, BlockPolicyStore, DeviceControl, ForegroundEvent, Monitor,
};
use blockwatch_storage::Database;
use std::{path::Path, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use super::helpers::{database_path, socket_path};

const EVENT_QUEUE_CAPACITY: usize = 64;

/// Device that reports interventions on the terminal
struct ConsoleDevice {
    host_app_id: String,
}

#[async_trait]
impl DeviceControl for ConsoleDevice {
    fn go_home(&self) -> Result<(), BlockError> {
        println!("[home] returning to home screen");
        Ok(())
    }

    async fn show_message(&self, text: &str) -> Result<(), BlockError> {
        println!("[message] {text}");
        Ok(())
    }

    async fn open_redirect(&self, payload: &RedirectPayload) -> Result<(), BlockError> {
        if self.host_app_id.is_empty() {
            return Err(BlockError::ActuationFault(
                "no host app configured as redirect target".to_string(),
            ));
        }
        println!(
            "[redirect] opening {} blocking screen for {} ({})",
            self.host_app_id, payload.display_name, payload.app_id
        );
        Ok(())
    }
}

pub async fn run_monitor(data_dir: &Path) -> Result<()> {
    let config = MonitorConfig::load(data_dir)?;
    let db = Database::new(Some(database_path(data_dir))).context("Failed to open policy database")?;
    let store = Arc::new(BlockPolicyStore::with_persistence(Arc::new(db)));
    let device = Arc::new(ConsoleDevice {
        host_app_id: config.host_app_id.clone(),
    });

    let mut monitor = Monitor::new(&config, store, device);
    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    tokio::spawn(read_stdin_events(tx));

    log::info!("Reading foreground events from stdin (one app id or JSON record per line)");
    monitor.run(rx, Some(socket_path(data_dir))).await
}

async fn read_stdin_events(tx: mpsc::Sender<ForegroundEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(event) = ForegroundEvent::parse_line(&line, now_millis()) {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::error!("Failed to read event from stdin: {e}");
                break;
            }
        }
    }
}
