//! Trait definitions with mockall annotations for testing
//!
//! The launcher and the shutdown path only ever see workers through these
//! traits, so tests can drive them with scripted processes.

use crate::error::HarnessResult;
use crate::worker::{CapturedOutput, TerminateOutcome, Worker, WorkerExit};

/// One running external process
#[mockall::automock]
#[async_trait::async_trait]
pub trait WorkerProcess: Send + Sync {
    /// OS process id, if the platform reported one
    fn pid(&self) -> Option<u32>;

    /// Non-blocking exit check; `None` while the process is still running
    fn exit_status(&self) -> Option<WorkerExit>;

    /// Buffered stdout/stderr tails; safe to call after the process exited
    async fn capture_output(&self) -> CapturedOutput;

    /// Request graceful termination (SIGTERM on unix)
    ///
    /// A process that is already gone is reported as
    /// `TerminateOutcome::AlreadyExited`, not as an error.
    fn terminate(&self) -> HarnessResult<TerminateOutcome>;
}

/// Starts workers from a rendered command line
#[mockall::automock]
pub trait Spawner: Send + Sync {
    /// Start the process for sequence number `seq`
    ///
    /// Returns as soon as the OS accepted the process; startup liveness is
    /// checked by the caller after registering the worker.
    fn spawn(&self, seq: u64, command: &str) -> HarnessResult<Worker>;
}
