//! Real worker process implementation
//!
//! Spawns workers as OS processes with piped output, and terminates them
//! with SIGTERM on unix.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};

use crate::error::{HarnessError, HarnessResult};
use crate::services::output_capture::{OutputBuffer, spawn_output_consumer};
use crate::traits::{Spawner, WorkerProcess};
use crate::worker::{CapturedOutput, TerminateOutcome, Worker, WorkerExit};
use shared::{Component, component_debug, component_info};

/// How long `capture_output` waits for pipes to close after an exit
const OUTPUT_SETTLE_TIMEOUT: Duration = Duration::from_millis(250);
const OUTPUT_SETTLE_POLL: Duration = Duration::from_millis(10);

/// Spawns workers as real OS processes
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    output_capacity: usize,
}

impl ProcessSpawner {
    pub fn new() -> Self {
        Self {
            output_capacity: crate::services::output_capture::OUTPUT_TAIL_BYTES,
        }
    }

    /// Configure bytes kept per output stream (fluent API)
    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }
}

impl Default for ProcessSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner for ProcessSpawner {
    fn spawn(&self, seq: u64, command: &str) -> HarnessResult<Worker> {
        component_info!(Component::Launcher, "Execute worker. seq: {}, cmd: {}", seq, command);

        let mut argv = command.split_whitespace();
        let program = argv.next().ok_or_else(|| HarnessError::Spawn {
            seq,
            command: command.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|source| HarnessError::Spawn {
            seq,
            command: command.to_string(),
            source,
        })?;

        let process = ChildProcess::new(seq, child, self.output_capacity);
        Ok(Worker::new(seq, command, Box::new(process)))
    }
}

/// Handle for one spawned OS process
pub struct ChildProcess {
    seq: u64,
    pid: Option<u32>,
    child: Mutex<Child>,
    stdout: Arc<OutputBuffer>,
    stderr: Arc<OutputBuffer>,
}

impl ChildProcess {
    /// Take ownership of the child and start draining its pipes
    fn new(seq: u64, mut child: Child, capacity: usize) -> Self {
        let stdout = Arc::new(OutputBuffer::new(capacity));
        let stderr = Arc::new(OutputBuffer::new(capacity));

        match child.stdout.take() {
            Some(pipe) => {
                spawn_output_consumer(pipe, stdout.clone());
            }
            None => stdout.mark_closed(),
        }
        match child.stderr.take() {
            Some(pipe) => {
                spawn_output_consumer(pipe, stderr.clone());
            }
            None => stderr.mark_closed(),
        }

        let pid = child.id();
        Self {
            seq,
            pid,
            child: Mutex::new(child),
            stdout,
            stderr,
        }
    }

    fn child(&self) -> std::sync::MutexGuard<'_, Child> {
        self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl WorkerProcess for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn exit_status(&self) -> Option<WorkerExit> {
        // try_wait caches the status, later calls keep returning it
        match self.child().try_wait() {
            Ok(Some(status)) => Some(WorkerExit::from(status)),
            Ok(None) => None,
            Err(e) => {
                component_debug!(Component::Monitor, "Status check for worker {} failed: {}", self.seq, e);
                None
            }
        }
    }

    async fn capture_output(&self) -> CapturedOutput {
        if self.exit_status().is_some() {
            let deadline = Instant::now() + OUTPUT_SETTLE_TIMEOUT;
            while !(self.stdout.is_closed() && self.stderr.is_closed()) && Instant::now() < deadline {
                tokio::time::sleep(OUTPUT_SETTLE_POLL).await;
            }
        }

        CapturedOutput {
            stdout: self.stdout.contents(),
            stderr: self.stderr.contents(),
        }
    }

    fn terminate(&self) -> HarnessResult<TerminateOutcome> {
        if self.exit_status().is_some() {
            return Ok(TerminateOutcome::AlreadyExited);
        }

        let Some(pid) = self.pid else {
            return Ok(TerminateOutcome::AlreadyExited);
        };

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => Ok(TerminateOutcome::Signaled),
                Err(Errno::ESRCH) => {
                    component_debug!(Component::Coordinator, "Worker {} (PID {}) already gone", self.seq, pid);
                    Ok(TerminateOutcome::AlreadyExited)
                }
                Err(errno) => Err(HarnessError::Terminate {
                    seq: self.seq,
                    pid,
                    message: errno.to_string(),
                }),
            }
        }

        #[cfg(not(unix))]
        {
            self.child()
                .start_kill()
                .map(|()| TerminateOutcome::Signaled)
                .map_err(|e| HarnessError::Terminate {
                    seq: self.seq,
                    pid,
                    message: e.to_string(),
                })
        }
    }
}
