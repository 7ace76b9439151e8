//! CLI command implementations

pub mod config;
pub mod lock;
pub mod operation;
pub mod query;

pub use config::execute as config;
pub use lock::{status as lock_status, wait as wait_unlocked};
pub use operation::{install, remove, update};
