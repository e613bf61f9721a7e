pub mod helpers;
pub mod policy;
pub mod run;
pub mod status;
