//! Status-Fd progress decoding
//!
//! Long-running package operations report progress as colon-delimited lines:
//!
//! ```text
//! pmstatus:nginx:42.8571:Unpacking nginx (1.24.0-2)
//! ```
//!
//! [`ProgressParser`] keeps the last observed state of one operation and
//! hands a snapshot to its callback on every accepted update. Anything it
//! cannot decode is dropped without an update.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Line prefixes carrying progress
const STATUS_PREFIXES: &[&str] = &["status", "pmstatus", "dlstatus"];

/// Coarse phase of a package operation, inferred from the status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Downloading,
    Unpacking,
    Installing,
    Configuring,
    Removing,
    Purging,
    Upgrading,
    Updating,
}

impl ProgressStage {
    /// Infer the stage by case-insensitive substring match
    pub fn infer(message: &str) -> Option<Self> {
        let lower = message.to_lowercase();
        const TABLE: &[(&str, ProgressStage)] = &[
            ("download", ProgressStage::Downloading),
            ("fetch", ProgressStage::Downloading),
            ("unpack", ProgressStage::Unpacking),
            ("install", ProgressStage::Installing),
            ("configur", ProgressStage::Configuring),
            ("remov", ProgressStage::Removing),
            ("purg", ProgressStage::Purging),
            ("upgrad", ProgressStage::Upgrading),
            ("updat", ProgressStage::Updating),
        ];
        TABLE
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, stage)| *stage)
    }
}

/// Snapshot of an operation's progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// Always within `0.0..=100.0`
    pub percentage: f64,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<ProgressStage>,

    pub complete: bool,

    pub cancelled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Receiver of progress snapshots
pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Stateful decoder for one in-flight operation
pub struct ProgressParser {
    state: ProgressEvent,
    cancel_requested: bool,
    finished: bool,
    callback: Option<ProgressCallback>,
}

impl ProgressParser {
    /// Create a parser reporting to `callback`
    pub fn new(callback: impl Fn(&ProgressEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            ..Self::default()
        }
    }

    /// Decode one status line. Returns whether it produced an update.
    pub fn parse_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }

        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() < 4 || !STATUS_PREFIXES.contains(&parts[0]) {
            trace!("Ignoring non-status line: {}", line);
            return false;
        }

        let Ok(percentage) = parts[2].trim().parse::<f64>() else {
            debug!("Ignoring status line with bad percentage: {}", line);
            return false;
        };

        // The message may itself contain colons
        let message = parts[3..].join(":");
        self.update(percentage, &message, Some(parts[1]))
    }

    /// Decode every line of a chunk of output. Returns the number of updates.
    pub fn parse_output(&mut self, text: &str) -> usize {
        text.split('\n').filter(|line| self.parse_line(line)).count()
    }

    /// Report progress that did not arrive as a status line
    pub fn report(&mut self, percentage: f64, message: &str, package: Option<&str>) -> bool {
        self.update(percentage, message, package)
    }

    /// Finish successfully
    pub fn complete(&mut self, message: Option<&str>) {
        let message = message.unwrap_or("Complete");
        self.finish(|state| {
            state.percentage = 100.0;
            state.message = message.to_string();
            state.cancelled = false;
        });
    }

    /// Finish as cancelled
    pub fn cancel(&mut self, message: Option<&str>) {
        self.cancel_requested = true;
        let message = message.unwrap_or("Cancelled");
        self.finish(|state| {
            state.message = message.to_string();
            state.cancelled = true;
        });
    }

    /// Finish with an error
    pub fn error(&mut self, message: &str) {
        self.finish(|state| {
            state.message = message.to_string();
            state.cancelled = false;
            state.error = Some(message.to_string());
        });
    }

    /// Last known state
    pub fn get_progress(&self) -> &ProgressEvent {
        &self.state
    }

    /// Whether cancellation was requested
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    /// Flag cancellation without emitting an event
    pub fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    /// Whether a terminal event was emitted
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn update(&mut self, percentage: f64, message: &str, package: Option<&str>) -> bool {
        if !percentage.is_finite() {
            debug!("Ignoring non-finite progress percentage");
            return false;
        }
        if self.finished {
            debug!("Ignoring progress after terminal event: {}", message);
            return false;
        }

        self.state = ProgressEvent {
            package: package.filter(|p| !p.is_empty()).map(str::to_string),
            percentage: percentage.clamp(0.0, 100.0),
            message: message.to_string(),
            stage: ProgressStage::infer(message),
            complete: false,
            cancelled: self.cancel_requested,
            error: None,
        };
        self.emit();
        true
    }

    fn finish(&mut self, apply: impl FnOnce(&mut ProgressEvent)) {
        if self.finished {
            debug!("Operation already finalized, dropping terminal event");
            return;
        }
        self.finished = true;
        self.state.complete = true;
        self.state.error = None;
        apply(&mut self.state);
        self.emit();
    }

    fn emit(&self) {
        if let Some(ref callback) = self.callback {
            callback(&self.state);
        }
    }
}

impl Default for ProgressParser {
    /// A parser without a callback; state is still tracked
    fn default() -> Self {
        Self {
            state: ProgressEvent::default(),
            cancel_requested: false,
            finished: false,
            callback: None,
        }
    }
}

impl std::fmt::Debug for ProgressParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressParser")
            .field("state", &self.state)
            .field("cancel_requested", &self.cancel_requested)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
