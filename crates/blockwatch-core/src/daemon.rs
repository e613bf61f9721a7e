use crate::{
    actuator::{DeviceControl, InterventionActuator, ScheduledActuator},
    config::MonitorConfig,
    engine::BlockDecisionEngine,
    event::ForegroundEvent,
    ipc::{claim_socket, listen, PolicyIpcHandler},
    policy::BlockPolicyStore,
};
use anyhow::{Context, Result};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::mpsc, time::interval};

const ACTIVATION_MESSAGE: &str = "\u{2705} Parental control activated";
const SHUTDOWN_POLL_MILLIS: u64 = 250;

/// Long-running monitor: one consumer of foreground events plus the
/// policy control channel
pub struct Monitor {
    engine: BlockDecisionEngine,
    actuator: Arc<dyn InterventionActuator>,
    device: Arc<dyn DeviceControl>,
    ipc_handler: Arc<PolicyIpcHandler>,
    monitoring_enabled: Arc<AtomicBool>,
    shutdown_signal: Arc<AtomicBool>,
}

impl Monitor {
    #[must_use]
    pub fn new(
        config: &MonitorConfig,
        store: Arc<BlockPolicyStore>,
        device: Arc<dyn DeviceControl>,
    ) -> Self {
        let monitoring_enabled = Arc::new(AtomicBool::new(false));
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let actuator = Arc::new(ScheduledActuator::new(Arc::clone(&device)));

        Self {
            engine: config.build_engine(store.clone()),
            actuator,
            device,
            ipc_handler: Arc::new(PolicyIpcHandler::new(
                store,
                monitoring_enabled.clone(),
                shutdown_signal.clone(),
            )),
            monitoring_enabled,
            shutdown_signal,
        }
    }

    #[must_use]
    pub fn ipc_handler(&self) -> Arc<PolicyIpcHandler> {
        self.ipc_handler.clone()
    }

    #[must_use]
    pub fn is_monitoring_enabled(&self) -> bool {
        self.monitoring_enabled.load(Ordering::SeqCst)
    }

    /// Consume events until the source closes or a shutdown is requested
    ///
    /// When `sock_path` is given the policy control channel is served on it
    /// for the lifetime of the loop.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<ForegroundEvent>,
        sock_path: Option<PathBuf>,
    ) -> Result<()> {
        if let Some(path) = &sock_path {
            claim_socket(path)
                .await
                .with_context(|| format!("Cannot serve policy control on {}", path.display()))?;
        }

        let listener = sock_path.clone().map(|path| {
            let handler = self.ipc_handler.clone();
            tokio::spawn(async move {
                if let Err(e) = listen(handler, &path).await {
                    log::error!("IPC listener failed: {e}");
                }
            })
        });

        self.monitoring_enabled.store(true, Ordering::SeqCst);
        if let Err(e) = self.device.show_message(ACTIVATION_MESSAGE).await {
            log::warn!("Failed to announce activation: {e}");
        }
        log::info!("Monitor started");

        let mut shutdown_poll = interval(Duration::from_millis(SHUTDOWN_POLL_MILLIS));

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => self.dispatch(&event).await,
                        None => {
                            log::info!("Event source closed, stopping monitor");
                            break;
                        }
                    }
                }
                _ = shutdown_poll.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    self.shutdown_signal.store(true, Ordering::SeqCst);
                }
            }

            if self.shutdown_signal.load(Ordering::SeqCst) {
                break;
            }
        }

        self.monitoring_enabled.store(false, Ordering::SeqCst);
        if let Some(listener) = listener {
            listener.abort();
        }
        if let Some(path) = sock_path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    log::warn!("Failed to remove socket {}: {e}", path.display());
                }
            }
        }
        log::info!("Monitor shut down gracefully.");
        Ok(())
    }

    /// Run one event through the engine and act on the outcome
    pub async fn dispatch(&mut self, event: &ForegroundEvent) {
        if !event.is_decision_relevant() {
            return;
        }

        self.ipc_handler
            .set_last_foreground_app(Some(event.app_id.clone()))
            .await;

        if let Some(plan) = self.engine.handle_event(event) {
            self.actuator.execute(plan);
            self.ipc_handler
                .set_last_blocked_app(Some(event.app_id.clone()))
                .await;
        }
    }
}
