//! Periodic spawn loop
//!
//! Starts one worker per interval until stop is requested or a worker fails
//! to come up. A launch failure is fatal to the run: the stress test is only
//! valid if every generated load unit is actually running.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{CommandTemplate, HarnessConfig};
use crate::coordinator::{RunCoordinator, ShutdownReason};
use crate::error::{HarnessError, HarnessResult};
use crate::traits::Spawner;
use crate::worker::Worker;
use shared::logging::{banner, tail};
use shared::{Component, component_debug, component_error};

pub struct Launcher<S: Spawner> {
    spawner: S,
    command: CommandTemplate,
    interval: Duration,
    startup_grace: Duration,
    output_tail_chars: usize,
    coordinator: Arc<RunCoordinator>,
}

impl<S: Spawner> Launcher<S> {
    pub fn new(spawner: S, config: &HarnessConfig, coordinator: Arc<RunCoordinator>) -> Self {
        Self {
            spawner,
            command: config.command.clone(),
            interval: config.spawn_interval,
            startup_grace: config.startup_grace,
            output_tail_chars: config.output_tail_chars,
            coordinator,
        }
    }

    /// Spawn until stopped; returns the launch error that aborted the run, if any
    pub async fn run(self) -> HarnessResult<()> {
        let state = self.coordinator.state().clone();

        loop {
            if state.is_stop_requested() {
                break;
            }

            let seq = state.next_sequence();
            if let Err(e) = self.launch(seq).await {
                component_error!(Component::Launcher, "Worker process {} failed to start. Terminating run...", seq);
                self.coordinator
                    .shutdown(ShutdownReason::LaunchFailure {
                        seq,
                        error: e.to_string(),
                    })
                    .await;
                return Err(e);
            }

            if state.is_stop_requested() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = state.stopped() => {}
            }
        }

        component_debug!(Component::Launcher, "Launcher stopped");
        Ok(())
    }

    /// Start one worker and verify it survives the startup grace window
    async fn launch(&self, seq: u64) -> HarnessResult<()> {
        let command = self.command.render(seq);

        let worker = match self.spawner.spawn(seq, &command) {
            Ok(worker) => Arc::new(worker),
            Err(e) => {
                component_error!(Component::Launcher, "{}", banner());
                component_error!(Component::Launcher, "Failed to start worker process {}: {}", seq, e);
                component_error!(Component::Launcher, "Command attempted: {}", command);
                component_error!(Component::Launcher, "{}", banner());
                return Err(e);
            }
        };

        // Registered before the liveness check so cleanup paths can see it
        self.coordinator.pool().register(worker.clone()).await;

        tokio::time::sleep(self.startup_grace).await;

        // Stop arrived during the grace window. If the drain already took the
        // worker it owns it; otherwise it registered too late and is ours to stop.
        if self.coordinator.state().is_stop_requested() {
            if let Some(late) = self.coordinator.pool().unregister_if_present(seq).await {
                component_debug!(Component::Launcher, "Stopping worker {} registered during shutdown", seq);
                if let Err(e) = late.terminate() {
                    component_debug!(Component::Launcher, "Cleanup of worker {} failed: {}", seq, e);
                }
            }
            return Ok(());
        }

        match worker.exit_status() {
            None => {
                component_debug!(
                    Component::Launcher,
                    "Worker process {} started successfully with PID: {}",
                    seq,
                    worker.pid_label()
                );
                Ok(())
            }
            Some(exit) => {
                self.coordinator.pool().unregister_if_present(seq).await;
                self.log_early_exit(&worker, &exit.to_string()).await;
                if let Err(e) = worker.terminate() {
                    component_debug!(Component::Launcher, "Cleanup of worker {} failed: {}", seq, e);
                }
                Err(HarnessError::EarlyExit {
                    seq,
                    command,
                    exit: exit.to_string(),
                })
            }
        }
    }

    async fn log_early_exit(&self, worker: &Worker, exit: &str) {
        let output = worker.capture_output().await;

        component_error!(Component::Launcher, "{}", banner());
        component_error!(Component::Launcher, "Worker process {} failed to start!", worker.seq());
        component_error!(Component::Launcher, "Exit status: {}", exit);
        component_error!(Component::Launcher, "Command: {}", worker.command());
        if !output.stdout.is_empty() {
            component_error!(Component::Launcher, "STDOUT:\n{}", tail(&output.stdout, self.output_tail_chars));
        }
        if !output.stderr.is_empty() {
            component_error!(Component::Launcher, "STDERR:\n{}", tail(&output.stderr, self.output_tail_chars));
        }
        component_error!(Component::Launcher, "{}", banner());
    }
}
