use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::engine::{InterventionAction, InterventionPlan, RedirectPayload};
use crate::error::BlockError;

/// Platform operations an intervention is made of
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Send the device back to the home screen
    fn go_home(&self) -> Result<(), BlockError>;

    /// Display a message to the user
    async fn show_message(&self, text: &str) -> Result<(), BlockError>;

    /// Open the host's blocking screen for the given app
    async fn open_redirect(&self, payload: &RedirectPayload) -> Result<(), BlockError>;
}

/// Executes intervention plans produced by the decision engine
pub trait InterventionActuator: Send + Sync {
    /// Run a plan; never fails, each failing step is logged and skipped
    fn execute(&self, plan: InterventionPlan);
}

/// Actuator running the home action inline and the rest on the tokio runtime
///
/// A redirect still waiting on its delay is aborted when the next plan
/// arrives, so at most one redirect is ever pending.
pub struct ScheduledActuator {
    device: Arc<dyn DeviceControl>,
    pending_redirect: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledActuator {
    #[must_use]
    pub fn new(device: Arc<dyn DeviceControl>) -> Self {
        Self {
            device,
            pending_redirect: Mutex::new(None),
        }
    }

    fn go_home(&self) {
        if let Err(e) = self.device.go_home() {
            log::error!("Failed to return to home screen: {e}");
        }
    }

    fn spawn_message(&self, runtime: &Handle, text: String) {
        let device = Arc::clone(&self.device);
        runtime.spawn(async move {
            if let Err(e) = device.show_message(&text).await {
                log::error!("Failed to show blocking message: {e}");
            }
        });
    }

    fn schedule_redirect(
        &self,
        runtime: &Handle,
        delay: std::time::Duration,
        payload: RedirectPayload,
    ) {
        let device = Arc::clone(&self.device);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = device.open_redirect(&payload).await {
                log::error!(
                    "Failed to open blocking screen for {}: {e}",
                    payload.app_id
                );
            }
        });

        match self.pending_redirect.lock() {
            Ok(mut pending) => {
                if let Some(previous) = pending.replace(handle) {
                    previous.abort();
                }
            }
            Err(_) => log::warn!("Pending redirect slot poisoned, redirect left untracked"),
        }
    }

    /// Abort a redirect that has not fired yet
    pub fn cancel_pending(&self) {
        if let Ok(mut pending) = self.pending_redirect.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}

impl InterventionActuator for ScheduledActuator {
    fn execute(&self, plan: InterventionPlan) {
        let runtime = Handle::try_current();

        for action in plan.into_actions() {
            match action {
                InterventionAction::GoHome => self.go_home(),
                InterventionAction::ShowMessage { text } => match &runtime {
                    Ok(runtime) => self.spawn_message(runtime, text),
                    Err(e) => log::error!("Cannot show message without a runtime: {e}"),
                },
                InterventionAction::OpenRedirect { delay, payload } => match &runtime {
                    Ok(runtime) => self.schedule_redirect(runtime, delay, payload),
                    Err(e) => log::error!("Cannot schedule redirect without a runtime: {e}"),
                },
            }
        }
    }
}

impl Drop for ScheduledActuator {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
