//! Load-generation harness for media streaming servers
//!
//! Spawns one external media-pushing process per interval against the target
//! server while listening for its alert callbacks. The first qualifying alert
//! (or a worker that fails to start, or an interrupt) stops the run, terminates
//! every spawned worker and reports the load level reached.

pub mod config;
pub mod coordinator;
pub mod core;
pub mod error;
pub mod harness;
pub mod launcher;
pub mod listener;
pub mod monitor;
pub mod services;
pub mod traits;
pub mod worker;

// Re-export commonly used types
pub use config::{CommandTemplate, ConfigOverrides, HarnessConfig};
pub use coordinator::{RunCoordinator, RunOutcome, RunReport, ShutdownReason};
pub use crate::core::{ProcessPool, RunState};
pub use error::{HarnessError, HarnessResult};
pub use harness::StressTester;
pub use services::ProcessSpawner;
pub use traits::{Spawner, WorkerProcess};
pub use worker::{CapturedOutput, TerminateOutcome, Worker, WorkerExit};
