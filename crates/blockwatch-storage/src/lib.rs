pub mod db;
pub mod migrations;

pub use db::{Database, APP_NAME_PREFIX, BLOCKED_APPS_KEY, POLICY_NAMESPACE};
