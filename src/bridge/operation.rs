//! Write-path plumbing: progress monitoring and terminal result detection
//!
//! Mutating commands print progress and their final result on the same
//! stdout stream. Each line is one of:
//!
//! - a Status-Fd line (`pmstatus:tree:40:Unpacking tree`)
//! - a tagged JSON progress line (`{"type": "progress", "percentage": 40, ...}`)
//! - the terminal result object (`{"success": true, "message": ...}`), either
//!   tagged `"type": "result"` or recognized by its boolean `success` field
//! - anything else (apt chatter), which is ignored

use crate::progress::{ProgressEvent, ProgressParser};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared view of one operation's progress.
///
/// Clones share state, so a caller can keep one clone to inspect or cancel
/// the operation while the facade drives the other. The progress callback
/// runs while the monitor is locked and must not call back into it.
#[derive(Clone, Default)]
pub struct ProgressMonitor {
    inner: Arc<Mutex<ProgressParser>>,
}

impl ProgressMonitor {
    /// Monitor forwarding every snapshot to `callback`
    pub fn new(callback: impl Fn(&ProgressEvent) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProgressParser::new(callback))),
        }
    }

    /// Last known state
    pub fn progress(&self) -> ProgressEvent {
        self.lock().get_progress().clone()
    }

    /// Flag cancellation; the running command is not interrupted
    pub fn request_cancel(&self) {
        self.lock().request_cancel();
    }

    /// Flag cancellation and emit the terminal cancelled event
    pub fn cancel(&self, message: Option<&str>) {
        self.lock().cancel(message);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.lock().is_cancel_requested()
    }

    pub(crate) fn parse_line(&self, line: &str) -> bool {
        self.lock().parse_line(line)
    }

    pub(crate) fn report(&self, percentage: f64, message: &str, package: Option<&str>) -> bool {
        self.lock().report(percentage, message, package)
    }

    pub(crate) fn complete(&self, message: Option<&str>) {
        self.lock().complete(message);
    }

    pub(crate) fn error(&self, message: &str) {
        self.lock().error(message);
    }

    fn lock(&self) -> MutexGuard<'_, ProgressParser> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressMonitor")
            .field("progress", &self.progress())
            .finish()
    }
}

/// Classified stdout line of a mutating command
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutputLine {
    /// Tagged JSON progress
    Progress {
        percentage: f64,
        message: String,
        package: Option<String>,
    },
    /// Terminal result object
    Result(Map<String, Value>),
    /// Candidate Status-Fd line; the progress parser decides
    Status,
    /// JSON that is neither progress nor a result
    Ignored,
}

pub(crate) fn classify_line(line: &str) -> OutputLine {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return OutputLine::Status;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => classify_object(map),
        _ => OutputLine::Ignored,
    }
}

fn classify_object(map: Map<String, Value>) -> OutputLine {
    match map.get("type").and_then(Value::as_str) {
        Some("progress") => {
            let Some(percentage) = map.get("percentage").and_then(Value::as_f64) else {
                return OutputLine::Ignored;
            };
            OutputLine::Progress {
                percentage,
                message: map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                package: map
                    .get("package")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        }
        Some("result") => OutputLine::Result(map),
        Some(_) => OutputLine::Ignored,
        // Untagged: fall back to the shape of a result
        None if map.get("success").is_some_and(Value::is_boolean) => OutputLine::Result(map),
        None => OutputLine::Ignored,
    }
}

/// Recover the terminal result from accumulated stdout.
///
/// Tries each line that opens a JSON object, last first, together with
/// everything after it; this also picks up a pretty-printed trailing object.
pub(crate) fn find_terminal(stdout: &str) -> Option<Map<String, Value>> {
    let lines: Vec<&str> = stdout.lines().collect();
    (0..lines.len())
        .rev()
        .filter(|&i| lines[i].trim_start().starts_with('{'))
        .find_map(|i| match classify_line(&lines[i..].join("\n")) {
            OutputLine::Result(map) => Some(map),
            _ => None,
        })
}
