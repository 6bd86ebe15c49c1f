//! Liveness sweep over the process pool
//!
//! Observation only: dead workers are logged but never removed, membership
//! belongs to the launcher and the shutdown path.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HarnessConfig;
use crate::core::{ProcessPool, RunState};
use shared::logging::{banner, tail};
use shared::{Component, component_debug, component_warn};

pub struct HealthMonitor {
    pool: Arc<ProcessPool>,
    state: Arc<RunState>,
    interval: Duration,
    output_tail_chars: usize,
    reported: HashSet<u64>,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ProcessPool>, state: Arc<RunState>, config: &HarnessConfig) -> Self {
        Self {
            pool,
            state,
            interval: config.monitor_interval,
            output_tail_chars: config.output_tail_chars,
            reported: HashSet::new(),
        }
    }

    pub async fn run(mut self) {
        component_debug!(Component::Monitor, "Worker process monitor started");

        while !self.state.is_stop_requested() {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.state.stopped() => break,
            }

            if self.state.is_stop_requested() {
                break;
            }
            self.sweep().await;
        }

        component_debug!(Component::Monitor, "Worker process monitor stopped");
    }

    /// Log every worker that died with a failure status since the last sweep
    ///
    /// Returns the sequence numbers reported by this sweep.
    pub async fn sweep(&mut self) -> Vec<u64> {
        let mut newly_reported = Vec::new();

        for worker in self.pool.snapshot().await {
            if self.reported.contains(&worker.seq()) {
                continue;
            }

            let Some(exit) = worker.exit_status() else {
                continue;
            };
            if exit.is_success() {
                continue;
            }

            let output = worker.capture_output().await;

            component_warn!(Component::Monitor, "{}", banner());
            component_warn!(
                Component::Monitor,
                "Worker process {} (PID: {}) terminated unexpectedly!",
                worker.seq(),
                worker.pid_label()
            );
            component_warn!(Component::Monitor, "Exit status: {}", exit);
            component_warn!(
                Component::Monitor,
                "Started at: {}",
                worker.started_at().format("%Y-%m-%d %H:%M:%S%.3f UTC")
            );
            component_warn!(Component::Monitor, "Uptime: {:.1} seconds", worker.uptime().as_secs_f64());
            if !output.stdout.is_empty() {
                component_warn!(Component::Monitor, "STDOUT:\n{}", tail(&output.stdout, self.output_tail_chars));
            }
            if !output.stderr.is_empty() {
                component_warn!(Component::Monitor, "STDERR:\n{}", tail(&output.stderr, self.output_tail_chars));
            }
            component_warn!(Component::Monitor, "{}", banner());

            self.reported.insert(worker.seq());
            newly_reported.push(worker.seq());
        }

        newly_reported
    }
}
