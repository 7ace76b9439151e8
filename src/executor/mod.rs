//! Command execution
//!
//! The executor is the only part of the bridge that touches the operating
//! system. Everything above it treats it as an opaque text channel:
//! a [`BridgeCommand`] goes in, accumulated stdout (or a raw failure) comes out.
//!
//! - [`ProcessExecutor`]: spawns the bridge tool with `tokio::process`
//! - [`CommandExecutor`]: the seam tests replace with scripted output

mod process;

pub use process::ProcessExecutor;

use crate::error::RawFailure;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Privilege hint passed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Elevation {
    /// Run as the calling user
    #[default]
    None,
    /// Elevate if it can be done without prompting (queries)
    Optional,
    /// Must run with administrator rights (mutations)
    Required,
}

impl fmt::Display for Elevation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Optional => "optional",
            Self::Required => "required",
        };
        f.write_str(s)
    }
}

/// One invocation of the bridge tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeCommand {
    /// Bridge subcommand (`search`, `install`, ...)
    pub name: String,

    /// Positional and flag arguments, in order
    pub args: Vec<String>,

    /// Zero disables the timeout
    pub timeout: Duration,

    pub elevation: Elevation,
}

impl BridgeCommand {
    /// Create a command with no timeout and no elevation
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
            timeout: Duration::ZERO,
            elevation: Elevation::None,
        }
    }

    /// Read-only query: elevation optional
    pub fn query(name: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(name, args).with_elevation(Elevation::Optional)
    }

    /// Mutating operation: elevation required
    pub fn operation(name: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(name, args).with_elevation(Elevation::Required)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_elevation(mut self, elevation: Elevation) -> Self {
        self.elevation = elevation;
        self
    }

    /// Command and arguments as one argv list
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for BridgeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// Output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Accumulated stdout, one `\n` after every line
    pub stdout: String,

    /// Captured stderr (warnings printed by a successful run)
    pub stderr: String,
}

/// Receives each complete stdout line while the command runs
pub type LineSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Runs bridge commands
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion.
    ///
    /// When `on_line` is given, every stdout line is forwarded to it as it
    /// arrives, in addition to being accumulated.
    async fn execute(
        &self,
        command: &BridgeCommand,
        on_line: Option<LineSink<'_>>,
    ) -> Result<ExecOutput, RawFailure>;
}
