//! Test utility functions for integration tests
//!
//! Provides common utilities for test setup, logging, and waiting on
//! asynchronous state.

use std::future::Future;
use std::time::Duration;

use hlrcore_gsup::ConnectionState;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing_subscriber::{fmt, EnvFilter};

/// Result type for integration tests
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Initialize logging for tests
///
/// Uses RUST_LOG environment variable if set, otherwise defaults to "info"
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// Wait for a condition to become true with timeout
///
/// # Arguments
/// * `condition` - Async function that returns true when condition is met
/// * `timeout_duration` - Maximum time to wait
/// * `poll_interval` - How often to check the condition
pub async fn wait_for_condition<F, Fut>(
    mut condition: F,
    timeout_duration: Duration,
    poll_interval: Duration,
) -> TestResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = timeout(timeout_duration, async {
        loop {
            if condition().await {
                return;
            }
            sleep(poll_interval).await;
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => Err("Condition not met within timeout".into()),
    }
}

/// Wait until a GSUP client reports `expected`
///
/// Returns immediately if the state already matches.
pub async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionState>,
    expected: ConnectionState,
    timeout_duration: Duration,
) -> TestResult {
    let result = timeout(timeout_duration, async {
        loop {
            if *rx.borrow_and_update() == expected {
                return Ok(());
            }
            if rx.changed().await.is_err() {
                return Err(());
            }
        }
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(())) => Err(format!("Client gone before reaching {expected}").into()),
        Err(_) => Err(format!("State {expected} not reached within timeout").into()),
    }
}

/// Default timeout for test operations
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default poll interval for condition checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wait_for_condition_success() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = flag.clone();

        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            flag_clone.store(true, Ordering::SeqCst);
        });

        let result = wait_for_condition(
            || async { flag.load(Ordering::SeqCst) },
            Duration::from_secs(1),
            Duration::from_millis(10),
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_condition_timeout() {
        let result = wait_for_condition(
            || async { false },
            Duration::from_millis(100),
            Duration::from_millis(10),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_wait_for_state() {
        let (tx, mut rx) = watch::channel(ConnectionState::Disconnected);
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            tx.send_replace(ConnectionState::Connecting);
            tx.send_replace(ConnectionState::Connected);
            // Keep the sender alive until the waiter has seen the value.
            sleep(Duration::from_millis(100)).await;
        });

        assert!(
            wait_for_state(&mut rx, ConnectionState::Connected, Duration::from_secs(1))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_wait_for_state_sender_dropped() {
        let (tx, mut rx) = watch::channel(ConnectionState::Disconnected);
        drop(tx);
        assert!(
            wait_for_state(&mut rx, ConnectionState::Connected, Duration::from_secs(1))
                .await
                .is_err()
        );
    }
}
