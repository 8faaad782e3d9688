/// Poll a condition until it yields a value or the deadline passes
use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// How often and how long to poll
pub struct PollingConfig {
    pub timeout: Duration,
    pub interval: Duration,
    pub description: String,
}

impl PollingConfig {
    /// Create a new polling configuration
    pub fn new(timeout: Duration, interval: Duration, description: impl Into<String>) -> Self {
        Self {
            timeout,
            interval,
            description: description.into(),
        }
    }

    /// Poll until condition is met or timeout
    ///
    /// The condition returns `Ok(Some(T))` when done, `Ok(None)` to keep
    /// polling and `Err(e)` to stop immediately with that error.
    pub async fn poll<F, Fut, T>(&self, mut condition: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        info!("{}...", self.description);

        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if let Some(value) = condition().await? {
                info!("✓ {} ({}s)", self.description, start.elapsed().as_secs());
                return Ok(value);
            }

            if start.elapsed() >= self.timeout {
                anyhow::bail!(
                    "Timeout after {} seconds: {}",
                    self.timeout.as_secs(),
                    self.description
                );
            }

            debug!("{}: attempt {} not done yet", self.description, attempt);
            tokio::time::sleep(self.interval).await;
        }
    }
}
