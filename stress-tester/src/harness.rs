//! Top-level run lifecycle
//!
//! Binds the alert listener first, then starts the health monitor and the
//! launcher as independent tasks. The run ends when some component completes
//! the shutdown sequence; the harness then lets the HTTP server finish
//! in-flight responses and joins the background tasks.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::HarnessConfig;
use crate::coordinator::{RunCoordinator, RunReport, ShutdownReason};
use crate::core::{ProcessPool, RunState};
use crate::error::{HarnessError, HarnessResult};
use crate::launcher::Launcher;
use crate::listener::{ListenerState, build_router};
use crate::monitor::HealthMonitor;
use crate::traits::Spawner;
use shared::{Component, component_debug, component_info, component_warn, logging};

/// How long background tasks get to notice the stop flag
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// One stress-test run against a target server
pub struct StressTester<S: Spawner + 'static> {
    config: HarnessConfig,
    spawner: S,
    listener: TcpListener,
    local_addr: SocketAddr,
    coordinator: Arc<RunCoordinator>,
}

impl<S: Spawner + 'static> StressTester<S> {
    /// Bind the alert endpoint and start the run clock
    pub async fn bind(config: HarnessConfig, spawner: S) -> HarnessResult<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| HarnessError::ServerStartup {
                address: config.bind_addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let coordinator = Arc::new(RunCoordinator::new(
            Arc::new(RunState::new()),
            Arc::new(ProcessPool::new()),
        ));

        Ok(Self {
            config,
            spawner,
            listener,
            local_addr,
            coordinator,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn coordinator(&self) -> Arc<RunCoordinator> {
        self.coordinator.clone()
    }

    /// Drive the run until shutdown; `interrupt` resolving stops it
    pub async fn run<F>(self, interrupt: F) -> HarnessResult<RunReport>
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            config,
            spawner,
            listener,
            local_addr,
            coordinator,
        } = self;
        let state = coordinator.state().clone();

        component_info!(Component::Harness, "Alert callback server running on {}", local_addr);

        let router = build_router(ListenerState::new(coordinator.clone(), config.alert_rules.clone()));
        let server = tokio::spawn({
            let state = state.clone();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move { state.stopped().await })
                    .await
            }
        });

        let monitor = tokio::spawn(HealthMonitor::new(coordinator.pool().clone(), state.clone(), &config).run());
        let launcher = tokio::spawn(Launcher::new(spawner, &config, coordinator.clone()).run());

        let report = tokio::select! {
            report = coordinator.wait_for_report() => report,
            _ = interrupt => {
                logging::log_shutdown(Component::Harness, "Received interrupt signal");
                coordinator.shutdown(ShutdownReason::Interrupt).await;
                coordinator.wait_for_report().await
            }
        };

        match join_with_timeout("alert server", server).await {
            Some(Err(e)) => logging::log_error(Component::Harness, "Alert server", &e),
            _ => {
                component_debug!(Component::Harness, "Alert server stopped");
            }
        }
        if let Some(Err(e)) = join_with_timeout("launcher", launcher).await {
            if e.is_fatal() {
                component_debug!(Component::Harness, "Launcher aborted the run: {}", e);
            } else {
                logging::log_error(Component::Harness, "Launcher", &e);
            }
        }
        join_with_timeout("monitor", monitor).await;

        if let Some(path) = &config.report_path {
            let json = serde_json::to_string_pretty(&report)?;
            tokio::fs::write(path, json).await?;
            component_info!(Component::Harness, "Run report written to {}", path.display());
        }

        logging::log_shutdown(Component::Harness, "Server shutting down.");
        Ok(report)
    }
}

/// Wait for a background task, aborting it if it does not stop in time
async fn join_with_timeout<T>(name: &str, mut handle: JoinHandle<T>) -> Option<T> {
    match tokio::time::timeout(TASK_JOIN_TIMEOUT, &mut handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            component_warn!(Component::Harness, "{} task failed: {}", name, e);
            None
        }
        Err(_) => {
            component_warn!(Component::Harness, "{} task did not stop in time, aborting", name);
            handle.abort();
            None
        }
    }
}
