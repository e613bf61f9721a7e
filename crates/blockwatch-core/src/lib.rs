pub mod actuator;
pub mod config;
pub mod daemon;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod event;
pub mod exemption;
pub mod ipc;
pub mod policy;

pub use actuator::{DeviceControl, InterventionActuator, ScheduledActuator};
pub use daemon::Monitor;
pub use engine::{BlockDecisionEngine, InterventionAction, InterventionPlan, RedirectPayload};
pub use error::BlockError;
pub use event::{EventKind, ForegroundEvent};
pub use policy::{BlockPolicy, BlockPolicyStore, PolicyPersistence};
