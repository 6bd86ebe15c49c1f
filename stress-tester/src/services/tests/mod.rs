//! Service-specific tests
//!
//! These spawn real processes, so they only run on unix where `sh` and
//! `sleep` are available.

#[cfg(all(test, unix))]
mod process_spawner;

#[cfg(all(test, unix))]
pub mod common {
    use std::time::Duration;

    /// Upper bound for a short-lived test process to exit
    pub const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Poll `condition` every 10ms until it holds or `EXIT_TIMEOUT` elapses
    pub async fn wait_until<F>(mut condition: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = tokio::time::Instant::now() + EXIT_TIMEOUT;
        while tokio::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }
}
