//! aptbridge - client runtime for an APT bridge tool
//!
//! Drives the package manager through a command-line bridge: runs the tool,
//! caches query results, decodes streamed progress and normalizes every
//! failure into one error shape.

pub mod bridge;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod progress;
pub mod translate;
pub mod ui;

pub use bridge::{Bridge, BridgeOptions, ProgressMonitor, QueryOptions};
pub use cache::CacheManager;
pub use error::{AppError, AppResult, BridgeError, BridgeResult, ErrorCode};
pub use executor::{BridgeCommand, CommandExecutor, Elevation, ProcessExecutor};
pub use progress::{ProgressEvent, ProgressParser, ProgressStage};
