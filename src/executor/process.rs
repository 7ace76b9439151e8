//! Bridge tool execution via `tokio::process`

use super::{BridgeCommand, CommandExecutor, Elevation, ExecOutput, LineSink};
use crate::config::schema::BridgeConfig;
use crate::error::{BridgeError, ProcessFailure, RawFailure};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Executor spawning the bridge tool as a child process
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: String,
    elevation_program: String,
}

impl ProcessExecutor {
    /// Create an executor for the given bridge program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            elevation_program: "pkexec".to_string(),
        }
    }

    /// Create an executor from the `[bridge]` config table
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.program.clone()).with_elevation_program(config.elevation_program.clone())
    }

    /// Program used to gain administrator rights (`pkexec`, `sudo`)
    pub fn with_elevation_program(mut self, program: impl Into<String>) -> Self {
        self.elevation_program = program.into();
        self
    }

    /// Bridge program path
    pub fn program(&self) -> &str {
        &self.program
    }

    fn is_root() -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail
        unsafe { libc::geteuid() == 0 }
    }

    /// Build the OS command for a bridge invocation.
    ///
    /// Only `Required` elevation wraps the call; `Optional` queries run as
    /// the calling user since the bridge can read the package cache without
    /// privileges.
    fn build(&self, command: &BridgeCommand) -> Command {
        let elevate = command.elevation == Elevation::Required && !Self::is_root();

        let mut cmd = if elevate {
            let mut cmd = Command::new(&self.elevation_program);
            cmd.arg(&self.program);
            cmd
        } else {
            Command::new(&self.program)
        };
        cmd.args(command.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(
        &self,
        command: &BridgeCommand,
        on_line: Option<LineSink<'_>>,
    ) -> Result<ExecOutput, RawFailure> {
        debug!(
            "Executing: {} {} (elevation: {})",
            self.program, command, command.elevation
        );

        let mut child = self.build(command).spawn().map_err(|e| {
            RawFailure::Message(format!("Failed to start {}: {}", self.program, e))
        })?;

        let collected = if command.timeout.is_zero() {
            collect_output(&mut child, on_line).await
        } else {
            match tokio::time::timeout(command.timeout, collect_output(&mut child, on_line)).await {
                Ok(collected) => collected,
                Err(_) => {
                    warn!(
                        "Command '{}' timed out after {:?}, killing it",
                        command.name, command.timeout
                    );
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill timed out command: {}", e);
                    }
                    return Err(
                        BridgeError::timeout(&command.name, command.timeout.as_secs()).into(),
                    );
                }
            }
        };

        let (stdout, stderr, status) =
            collected.map_err(|e| RawFailure::Message(format!("{}: {}", command.name, e)))?;

        if status.success() {
            info!("Command '{}' completed", command.name);
            Ok(ExecOutput { stdout, stderr })
        } else {
            debug!("Command '{}' failed: {}", command.name, status);
            Err(RawFailure::Process(ProcessFailure {
                exit_status: status.code(),
                signal: exit_signal(&status),
                reason: None,
                stderr,
            }))
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Stream stdout and stderr until both close, then reap the child.
///
/// Stdout lines are forwarded to `on_line` and accumulated; stderr is only
/// accumulated. Lines are read as raw bytes and decoded lossily, so a stray
/// non-UTF-8 byte never stops a pipe from draining.
async fn collect_output(
    child: &mut Child,
    on_line: Option<LineSink<'_>>,
) -> std::io::Result<(String, String, ExitStatus)> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("stdout not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("stderr not piped"))?;

    let mut stdout_reader = BufReader::new(stdout);
    let mut stderr_reader = BufReader::new(stderr);

    // Partial reads survive a cancelled `read_until`, so the buffers live
    // outside the loop and are only cleared once a line is complete.
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let mut out = String::new();
    let mut err = String::new();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            read = stdout_reader.read_until(b'\n', &mut out_buf), if !stdout_done => {
                match next_line(read, &mut out_buf, "stdout") {
                    LineRead::Line(line) => {
                        if let Some(sink) = on_line {
                            sink(&line);
                        }
                        out.push_str(&line);
                        out.push('\n');
                    }
                    LineRead::Partial => {}
                    LineRead::Closed(last) => {
                        if let Some(line) = last {
                            if let Some(sink) = on_line {
                                sink(&line);
                            }
                            out.push_str(&line);
                            out.push('\n');
                        }
                        stdout_done = true;
                    }
                }
            }
            read = stderr_reader.read_until(b'\n', &mut err_buf), if !stderr_done => {
                match next_line(read, &mut err_buf, "stderr") {
                    LineRead::Line(line) => {
                        err.push_str(&line);
                        err.push('\n');
                    }
                    LineRead::Partial => {}
                    LineRead::Closed(last) => {
                        if let Some(line) = last {
                            err.push_str(&line);
                            err.push('\n');
                        }
                        stderr_done = true;
                    }
                }
            }
        }
    }

    let status = child.wait().await?;
    Ok((out, err, status))
}

/// Outcome of one `read_until` call on a pipe
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    /// A complete newline-terminated line
    Line(String),
    /// Bytes without a newline yet; EOF or more data follows
    Partial,
    /// The pipe is finished, with any unterminated trailing line
    Closed(Option<String>),
}

fn next_line(read: std::io::Result<usize>, buf: &mut Vec<u8>, pipe: &str) -> LineRead {
    match read {
        Ok(0) => LineRead::Closed(take_line(buf)),
        Ok(_) if buf.last() == Some(&b'\n') => match take_line(buf) {
            Some(line) => LineRead::Line(line),
            None => LineRead::Partial,
        },
        Ok(_) => LineRead::Partial,
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => LineRead::Partial,
        Err(e) => {
            warn!("Stopped reading {}: {}", pipe, e);
            LineRead::Closed(take_line(buf))
        }
    }
}

fn take_line(buf: &mut Vec<u8>) -> Option<String> {
    if buf.is_empty() {
        return None;
    }
    let line = decode_line(buf.as_slice());
    buf.clear();
    Some(line)
}

/// Decode one line, replacing invalid UTF-8 and dropping the line ending
fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
