use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::Mutex,
};

use crate::error::BlockError;
use crate::policy::BlockPolicyStore;

/// IPC request from a host to the monitor
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcRequest {
    /// Replace the blocklist; `None` is rejected as an invalid argument
    UpdateBlockedApps {
        blocked_apps: Option<HashMap<String, String>>,
    },
    ClearBlockedApps,
    ListBlockedApps,
    IsMonitoringEnabled,
    Status,
    Shutdown,
}

/// IPC response from the monitor to a host
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcResponse {
    Ok,
    Error {
        code: String,
        message: String,
    },
    BlockedApps(BTreeMap<String, String>),
    MonitoringEnabled(bool),
    Status {
        monitoring_enabled: bool,
        blocked_count: usize,
        last_foreground_app: Option<String>,
        last_blocked_app: Option<String>,
        uptime_seconds: u64,
    },
    Shutdown,
}

impl From<BlockError> for IpcResponse {
    fn from(err: BlockError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

/// Policy control surface served by the monitor
pub struct PolicyIpcHandler {
    store: Arc<BlockPolicyStore>,
    monitoring_enabled: Arc<AtomicBool>,
    shutdown_signal: Arc<AtomicBool>,
    last_foreground_app: Mutex<Option<String>>,
    last_blocked_app: Mutex<Option<String>>,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl PolicyIpcHandler {
    pub fn new(
        store: Arc<BlockPolicyStore>,
        monitoring_enabled: Arc<AtomicBool>,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            monitoring_enabled,
            shutdown_signal,
            last_foreground_app: Mutex::new(None),
            last_blocked_app: Mutex::new(None),
            started_at: chrono::Utc::now(),
        }
    }

    pub async fn set_last_foreground_app(&self, app_id: Option<String>) {
        let mut lock = self.last_foreground_app.lock().await;
        *lock = app_id;
    }

    pub async fn set_last_blocked_app(&self, app_id: Option<String>) {
        let mut lock = self.last_blocked_app.lock().await;
        *lock = app_id;
    }

    /// Build the response for a single request
    pub async fn respond(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::UpdateBlockedApps { blocked_apps } => {
                match self.store.update_policy(blocked_apps) {
                    Ok(()) => IpcResponse::Ok,
                    Err(e) => {
                        log::warn!("Rejected blocklist update: {e}");
                        e.into()
                    }
                }
            }
            IpcRequest::ClearBlockedApps => match self.store.clear_policy() {
                Ok(()) => IpcResponse::Ok,
                Err(e) => {
                    log::warn!("Failed to clear blocklist: {e}");
                    e.into()
                }
            },
            IpcRequest::ListBlockedApps => match self.store.snapshot() {
                Ok(list) => IpcResponse::BlockedApps((*list).clone()),
                Err(e) => e.into(),
            },
            IpcRequest::IsMonitoringEnabled => {
                IpcResponse::MonitoringEnabled(self.monitoring_enabled.load(Ordering::SeqCst))
            }
            IpcRequest::Status => {
                let foreground = self.last_foreground_app.lock().await.clone();
                let blocked = self.last_blocked_app.lock().await.clone();
                let uptime = chrono::Utc::now().signed_duration_since(self.started_at);

                IpcResponse::Status {
                    monitoring_enabled: self.monitoring_enabled.load(Ordering::SeqCst),
                    blocked_count: self.store.snapshot().map_or(0, |list| list.len()),
                    last_foreground_app: foreground,
                    last_blocked_app: blocked,
                    uptime_seconds: u64::try_from(uptime.num_seconds()).unwrap_or(0),
                }
            }
            IpcRequest::Shutdown => {
                self.shutdown_signal.store(true, Ordering::SeqCst);
                IpcResponse::Shutdown
            }
        }
    }

    pub async fn handle(
        &self,
        stream: &mut UnixStream,
        request: IpcRequest,
    ) -> Result<(), anyhow::Error> {
        let response = self.respond(request).await;
        let encoded = bincode::serialize(&response)?;
        stream.write_all(&encoded).await?;
        Ok(())
    }
}

/// Make `sock_path` free for a new listener
///
/// A leftover socket file nobody answers on is removed. Fails with
/// `AddrInUse` while another monitor still accepts connections there.
pub async fn claim_socket(sock_path: &Path) -> io::Result<()> {
    if !sock_path.exists() {
        return Ok(());
    }

    if UnixStream::connect(sock_path).await.is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AddrInUse,
            format!("another monitor is listening on {}", sock_path.display()),
        ));
    }

    log::warn!("Removing stale socket file {}", sock_path.display());
    fs::remove_file(sock_path)
}

pub async fn listen(handler: Arc<PolicyIpcHandler>, sock_path: &Path) -> io::Result<()> {
    claim_socket(sock_path).await?;
    let listener = UnixListener::bind(sock_path)?;
    log::info!("Policy control channel listening on {}", sock_path.display());

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    match stream.read_to_end(&mut buf).await {
                        Ok(n) if n > 0 => match bincode::deserialize::<IpcRequest>(&buf) {
                            Ok(request) => {
                                if let Err(e) = handler.handle(&mut stream, request).await {
                                    log::error!("IPC handle error: {e}");
                                }
                            }
                            Err(e) => {
                                log::error!("IPC deserialize error: {e}");
                            }
                        },
                        Ok(_) => {} // Connection closed
                        Err(e) => {
                            log::error!("IPC read error: {e}");
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn handler() -> (Arc<PolicyIpcHandler>, Arc<AtomicBool>) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let handler = PolicyIpcHandler::new(
            Arc::new(BlockPolicyStore::new()),
            Arc::new(AtomicBool::new(true)),
            shutdown.clone(),
        );
        (Arc::new(handler), shutdown)
    }

    fn blocked(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_update_list_and_clear() {
        let (handler, _) = handler();

        let response = handler
            .respond(IpcRequest::UpdateBlockedApps {
                blocked_apps: blocked(&[("com.game", "GameApp")]),
            })
            .await;
        assert_eq!(response, IpcResponse::Ok);

        match handler.respond(IpcRequest::ListBlockedApps).await {
            IpcResponse::BlockedApps(list) => {
                assert_eq!(list.get("com.game").map(String::as_str), Some("GameApp"));
            }
            other => panic!("unexpected response: {other:?}"),
        }

        assert_eq!(
            handler.respond(IpcRequest::ClearBlockedApps).await,
            IpcResponse::Ok
        );
        assert_eq!(
            handler.respond(IpcRequest::ListBlockedApps).await,
            IpcResponse::BlockedApps(BTreeMap::new())
        );
    }

    #[tokio::test]
    async fn test_missing_map_is_invalid_argument() {
        let (handler, _) = handler();
        let response = handler
            .respond(IpcRequest::UpdateBlockedApps { blocked_apps: None })
            .await;

        match response {
            IpcResponse::Error { code, .. } => assert_eq!(code, "INVALID_ARGUMENT"),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_and_shutdown() {
        let (handler, shutdown) = handler();
        handler
            .set_last_foreground_app(Some("com.chat".to_string()))
            .await;

        match handler.respond(IpcRequest::Status).await {
            IpcResponse::Status {
                monitoring_enabled,
                blocked_count,
                last_foreground_app,
                last_blocked_app,
                ..
            } => {
                assert!(monitoring_enabled);
                assert_eq!(blocked_count, 0);
                assert_eq!(last_foreground_app.as_deref(), Some("com.chat"));
                assert!(last_blocked_app.is_none());
            }
            other => panic!("unexpected response: {other:?}"),
        }

        assert_eq!(
            handler.respond(IpcRequest::IsMonitoringEnabled).await,
            IpcResponse::MonitoringEnabled(true)
        );
        assert_eq!(
            handler.respond(IpcRequest::Shutdown).await,
            IpcResponse::Shutdown
        );
        assert!(shutdown.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_client_round_trip_over_socket() {
        let dir = TempDir::new().unwrap();
        let sock_path = dir.path().join("blockwatch.sock");
        let (handler, _) = handler();

        let listener_path = sock_path.clone();
        let server = tokio::spawn(async move { listen(handler, &listener_path).await });

        // Wait for the listener to bind
        for _ in 0..50 {
            if sock_path.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let client = IpcClient::new(&sock_path);
        let response = client
            .send_command(IpcRequest::UpdateBlockedApps {
                blocked_apps: blocked(&[("com.game", "GameApp")]),
            })
            .await
            .unwrap();
        assert_eq!(response, IpcResponse::Ok);

        let response = client.send_command(IpcRequest::ListBlockedApps).await.unwrap();
        assert!(matches!(response, IpcResponse::BlockedApps(list) if list.len() == 1));

        server.abort();
    }

    #[tokio::test]
    async fn test_live_socket_is_not_taken_over() {
        let dir = TempDir::new().unwrap();
        let sock_path = dir.path().join("blockwatch.sock");
        let (first, _) = handler();

        let listener_path = sock_path.clone();
        let server = tokio::spawn(async move { listen(first, &listener_path).await });
        for _ in 0..50 {
            if sock_path.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let err = claim_socket(&sock_path).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);

        let (second, _) = handler();
        assert!(listen(second, &sock_path).await.is_err());

        // The first monitor still answers
        let response = IpcClient::new(&sock_path)
            .send_command(IpcRequest::IsMonitoringEnabled)
            .await
            .unwrap();
        assert_eq!(response, IpcResponse::MonitoringEnabled(true));

        server.abort();
    }

    #[tokio::test]
    async fn test_stale_socket_file_is_removed() {
        let dir = TempDir::new().unwrap();
        let sock_path = dir.path().join("blockwatch.sock");
        fs::write(&sock_path, b"").unwrap();

        claim_socket(&sock_path).await.unwrap();
        assert!(!sock_path.exists());
    }
}
