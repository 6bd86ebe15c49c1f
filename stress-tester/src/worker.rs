//! Worker handle for one spawned load-generating process

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Instant;

use crate::error::HarnessResult;
use crate::traits::WorkerProcess;

/// How a worker process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl WorkerExit {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for WorkerExit {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// Captured stdout/stderr of a worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Result of a terminate request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// Termination signal delivered
    Signaled,
    /// The process had already exited
    AlreadyExited,
}

/// One registered load unit
///
/// Never mutated after creation; only its process is observed.
pub struct Worker {
    seq: u64,
    pid: Option<u32>,
    command: String,
    started_at: DateTime<Utc>,
    started: Instant,
    process: Box<dyn WorkerProcess>,
}

impl Worker {
    pub fn new(seq: u64, command: impl Into<String>, process: Box<dyn WorkerProcess>) -> Self {
        Self {
            seq,
            pid: process.pid(),
            command: command.into(),
            started_at: Utc::now(),
            started: Instant::now(),
            process,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// PID for log lines, `?` when unknown
    pub fn pid_label(&self) -> String {
        self.pid.map(|pid| pid.to_string()).unwrap_or_else(|| "?".to_string())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    pub fn is_alive(&self) -> bool {
        self.process.exit_status().is_none()
    }

    pub fn exit_status(&self) -> Option<WorkerExit> {
        self.process.exit_status()
    }

    pub async fn capture_output(&self) -> CapturedOutput {
        self.process.capture_output().await
    }

    pub fn terminate(&self) -> HarnessResult<TerminateOutcome> {
        self.process.terminate()
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("seq", &self.seq)
            .field("pid", &self.pid)
            .field("command", &self.command)
            .field("started_at", &self.started_at)
            .finish()
    }
}
