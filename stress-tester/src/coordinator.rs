//! Shutdown coordination
//!
//! The shutdown sequence can be triggered by the launcher (a worker failed to
//! come up), the alert listener (a qualifying alert) or the top-level
//! interrupt. Whichever caller flips the stop flag first runs the sequence;
//! everyone else returns immediately.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::core::{ProcessPool, RunState};
use crate::worker::TerminateOutcome;
use shared::logging::{self, banner};
use shared::{Component, component_debug, component_error, component_info};

/// What started the shutdown sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShutdownReason {
    /// A qualifying alert arrived from the target
    Alert { code: String },
    /// A worker failed to spawn or exited during startup
    LaunchFailure { seq: u64, error: String },
    /// Ctrl+C / SIGTERM on the harness itself
    Interrupt,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Alert { code } => write!(f, "Alert Type: {code}"),
            ShutdownReason::LaunchFailure { seq, .. } => write!(f, "Launch Failure: worker {seq}"),
            ShutdownReason::Interrupt => write!(f, "Interrupted"),
        }
    }
}

/// How the run concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The target was driven to its breaking point
    DegradationDetected,
    /// The operator stopped the run
    Interrupted,
    /// The harness could not keep its load units running
    HarnessFailure,
}

impl RunOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::DegradationDetected | RunOutcome::Interrupted => 0,
            RunOutcome::HarnessFailure => 1,
        }
    }
}

impl From<&ShutdownReason> for RunOutcome {
    fn from(reason: &ShutdownReason) -> Self {
        match reason {
            ShutdownReason::Alert { .. } => RunOutcome::DegradationDetected,
            ShutdownReason::LaunchFailure { .. } => RunOutcome::HarnessFailure,
            ShutdownReason::Interrupt => RunOutcome::Interrupted,
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub reason: ShutdownReason,
    pub outcome: RunOutcome,
    /// Workers registered in the pool when shutdown began
    pub total_started: usize,
    /// Workers that received a termination signal
    pub terminated: usize,
    pub elapsed_secs: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Owns the stop signal and runs the shutdown sequence at most once
#[derive(Debug)]
pub struct RunCoordinator {
    state: Arc<RunState>,
    pool: Arc<ProcessPool>,
    report_tx: watch::Sender<Option<RunReport>>,
}

impl RunCoordinator {
    pub fn new(state: Arc<RunState>, pool: Arc<ProcessPool>) -> Self {
        let (report_tx, _) = watch::channel(None);
        Self { state, pool, report_tx }
    }

    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    pub fn pool(&self) -> &Arc<ProcessPool> {
        &self.pool
    }

    /// Run the shutdown sequence if no one else has
    ///
    /// Returns the report for the caller that performed the teardown and
    /// `None` for every later or concurrent caller.
    pub async fn shutdown(&self, reason: ShutdownReason) -> Option<RunReport> {
        if !self.state.request_stop() {
            component_debug!(Component::Coordinator, "Shutdown already in progress, ignoring {}", reason);
            return None;
        }

        logging::log_shutdown(Component::Coordinator, &reason.to_string());

        // Read before draining, the drain clears the pool
        let total_started = self.pool.len().await;
        let elapsed = self.state.elapsed();

        component_info!(Component::Coordinator, "Stopping all worker processes...");
        let workers = self.pool.drain_all().await;

        let mut terminated = 0;
        for worker in &workers {
            match worker.terminate() {
                Ok(TerminateOutcome::Signaled) => {
                    terminated += 1;
                    component_debug!(
                        Component::Coordinator,
                        "Sent SIGTERM to worker {} (PID {})",
                        worker.seq(),
                        worker.pid_label()
                    );
                }
                Ok(TerminateOutcome::AlreadyExited) => {
                    component_debug!(
                        Component::Coordinator,
                        "Worker {} (PID {}) had already exited",
                        worker.seq(),
                        worker.pid_label()
                    );
                }
                Err(e) => {
                    component_error!(Component::Coordinator, "Error terminating worker {}: {}", worker.seq(), e);
                }
            }
        }

        let report = RunReport {
            outcome: RunOutcome::from(&reason),
            reason,
            total_started,
            terminated,
            elapsed_secs: elapsed.as_secs_f64(),
            started_at: self.state.started_at(),
            finished_at: Utc::now(),
        };

        log_report(&report);
        self.report_tx.send_replace(Some(report.clone()));
        Some(report)
    }

    /// Report of the run once some caller completed the shutdown sequence
    pub fn report(&self) -> Option<RunReport> {
        self.report_tx.borrow().clone()
    }

    /// Wait until the shutdown sequence has produced its report
    pub async fn wait_for_report(&self) -> RunReport {
        let mut rx = self.report_tx.subscribe();
        let report = match rx.wait_for(Option::is_some).await {
            Ok(report) => report.clone(),
            Err(_) => None,
        };

        match report {
            Some(report) => report,
            // The sender lives in self, so the channel never closes while we wait
            None => std::future::pending().await,
        }
    }
}

fn log_report(report: &RunReport) {
    component_info!(Component::Coordinator, "{}", banner());
    component_info!(Component::Coordinator, "Test Results:");
    component_info!(Component::Coordinator, "  - {}", report.reason);
    component_info!(Component::Coordinator, "  - Total Streams Started: {}", report.total_started);
    component_info!(Component::Coordinator, "  - Streams Terminated: {}", report.terminated);
    component_info!(Component::Coordinator, "  - Test Duration: {:.2} seconds", report.elapsed_secs);
    component_info!(Component::Coordinator, "  - Outcome: {:?}", report.outcome);
    component_info!(Component::Coordinator, "{}", banner());
}
