//! Common test utilities for the end-to-end runs
//!
//! Every run binds an ephemeral port and spawns real `sleep` workers, so the
//! suites that use this module are unix-only.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use stress_tester::{CommandTemplate, HarnessConfig};
use tokio::sync::oneshot;

/// Upper bound for anything a test waits on
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

pub const CONGESTION_ALERT: &str = r##"{
    "sourceUri": "#default#app/stream0",
    "type": "INTERNAL_QUEUE",
    "messages": [{"code": "INTERNAL_QUEUE_CONGESTION", "description": "Internal queue(s) is currently congested"}]
}"##;

/// Config pointed at an ephemeral local port with fast timings
pub fn test_config(command: &str) -> HarnessConfig {
    let mut config = HarnessConfig::new(CommandTemplate::new(command).expect("valid command"));
    config.bind_addr = SocketAddr::from(([127, 0, 0, 1], 0));
    config.spawn_interval = Duration::from_millis(300);
    config.startup_grace = Duration::from_millis(100);
    config.monitor_interval = Duration::from_millis(100);
    config.log.file = None;
    config
}

pub fn with_report(mut config: HarnessConfig, path: PathBuf) -> HarnessConfig {
    config.report_path = Some(path);
    config
}

/// Interrupt future paired with the sender that fires it
pub fn interrupt() -> (oneshot::Sender<()>, impl Future<Output = ()> + Send + 'static) {
    let (tx, rx) = oneshot::channel::<()>();
    let signal = async move {
        // A dropped sender means the test never interrupts
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    (tx, signal)
}

/// Poll an async condition every 20ms until it holds or `WAIT_TIMEOUT` elapses
pub async fn wait_for<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition().await
}

pub fn callback_url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

pub async fn post(addr: SocketAddr, path: &str, body: &str) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(callback_url(addr, path))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("request should reach the listener")
        .status()
}
