//! gocryptfs orchestration: validation, subprocess driving and mount checks.

/// Subprocess runner.
pub mod command;
/// gocryptfs command wrapper.
pub mod gocryptfs;
/// Mount-table inspection.
pub mod mounts;
/// Request forms and validated requests.
pub mod types;
/// Input validators.
pub mod validation;

mod manager;

pub use manager::{extract_master_key, VaultManager};
