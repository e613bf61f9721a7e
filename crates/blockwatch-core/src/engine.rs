//! Blocking decision engine.
//!
//! Per event the engine walks a fixed pipeline:
//! - discard anything that is not a window change for a named app
//! - debounce repeats of the same app
//! - skip exempt apps (host app, launchers, system UI)
//! - look the app up in the current blocklist
//!
//! A hit yields an `InterventionPlan`; every other path yields nothing.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::debounce::ForegroundDebouncer;
use crate::event::ForegroundEvent;
use crate::exemption::ExemptionFilter;
use crate::policy::BlockPolicy;

/// Default delay before the redirect screen is opened
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 500;

/// Data handed to the host's blocking screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectPayload {
    pub app_id: String,
    pub display_name: String,
}

/// Single step of an intervention
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterventionAction {
    GoHome,
    ShowMessage { text: String },
    OpenRedirect { delay: Duration, payload: RedirectPayload },
}

/// Ordered actions for one blocking decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionPlan {
    actions: Vec<InterventionAction>,
}

impl InterventionPlan {
    /// Home, then the message, then the delayed redirect
    #[must_use]
    pub fn for_blocked_app(app_id: &str, display_name: &str, redirect_delay: Duration) -> Self {
        Self {
            actions: vec![
                InterventionAction::GoHome,
                InterventionAction::ShowMessage {
                    text: blocked_message(display_name),
                },
                InterventionAction::OpenRedirect {
                    delay: redirect_delay,
                    payload: RedirectPayload {
                        app_id: app_id.to_string(),
                        display_name: display_name.to_string(),
                    },
                },
            ],
        }
    }

    #[must_use]
    pub fn actions(&self) -> &[InterventionAction] {
        &self.actions
    }

    #[must_use]
    pub fn into_actions(self) -> Vec<InterventionAction> {
        self.actions
    }
}

/// User-facing text shown when a blocked app is pushed away
#[must_use]
pub fn blocked_message(display_name: &str) -> String {
    format!("\u{23f0} {display_name} is blocked. You have reached your daily limit.")
}

/// Why an event did or did not lead to an intervention
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Not a window change, or no app identifier
    Discarded,
    /// Same app seen inside the debounce window
    Debounced,
    Exempt,
    NotBlocked,
    Blocked(InterventionPlan),
}

impl Decision {
    #[must_use]
    pub fn into_plan(self) -> Option<InterventionPlan> {
        match self {
            Self::Blocked(plan) => Some(plan),
            _ => None,
        }
    }
}

/// Event-reaction engine deciding when to push a blocked app away
///
/// Owns the debounce state, so it must be driven by one sequential event
/// stream. The blocklist is re-read on every event.
pub struct BlockDecisionEngine {
    debouncer: ForegroundDebouncer,
    exemptions: ExemptionFilter,
    policy: Arc<dyn BlockPolicy>,
    redirect_delay: Duration,
}

impl BlockDecisionEngine {
    #[must_use]
    pub fn new(
        debouncer: ForegroundDebouncer,
        exemptions: ExemptionFilter,
        policy: Arc<dyn BlockPolicy>,
    ) -> Self {
        Self {
            debouncer,
            exemptions,
            policy,
            redirect_delay: Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS),
        }
    }

    #[must_use]
    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    /// Handle one foreground event, returning the plan to execute if any
    ///
    /// Never fails: a policy read error counts as "not blocked".
    pub fn handle_event(&mut self, event: &ForegroundEvent) -> Option<InterventionPlan> {
        self.evaluate(event).into_plan()
    }

    /// Run the decision pipeline and report where the event stopped
    pub fn evaluate(&mut self, event: &ForegroundEvent) -> Decision {
        if !event.is_decision_relevant() {
            return Decision::Discarded;
        }

        let app_id = event.app_id.as_str();
        if !self
            .debouncer
            .should_process(app_id, event.timestamp_millis)
        {
            log::debug!("Debounced foreground event for {app_id}");
            return Decision::Debounced;
        }

        if self.exemptions.is_exempt(app_id) {
            log::debug!("Foreground app {app_id} is exempt from blocking");
            return Decision::Exempt;
        }

        let display_name = match self.policy.lookup(app_id) {
            Ok(Some(name)) => name,
            Ok(None) => return Decision::NotBlocked,
            Err(e) => {
                log::warn!("Treating {app_id} as not blocked after lookup failure: {e}");
                return Decision::NotBlocked;
            }
        };

        log::info!("Blocking foreground app {display_name} ({app_id})");
        Decision::Blocked(InterventionPlan::for_blocked_app(
            app_id,
            &display_name,
            self.redirect_delay,
        ))
    }
}

#[cfg(test)]
mod tests;
