//! Process-wide request pacing.
//!
//! Every client talking to one remote service shares a single `RateGate`.
//! The gate remembers when the last request started and makes the next
//! caller wait until the configured interval has passed. The check, the wait
//! and the timestamp update happen under one lock, so concurrent callers are
//! serialized rather than racing past the interval.

use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Time source used by the gate.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio's timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Enforces a minimum interval between request starts.
pub struct RateGate {
    min_interval: Option<Duration>,
    last_start: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateGate {
    /// A gate that never waits.
    pub fn unlimited() -> Self {
        Self {
            min_interval: None,
            last_start: Mutex::new(None),
            clock: Arc::new(TokioClock),
        }
    }

    /// Creates a gate from a minimum interval in seconds.
    ///
    /// `None` or zero disables pacing. Negative or non-finite values are
    /// rejected.
    pub fn from_seconds(min_seconds: Option<f64>) -> ClientResult<Self> {
        Self::with_clock(min_seconds, Arc::new(TokioClock))
    }

    /// Creates a gate with a custom time source.
    pub fn with_clock(min_seconds: Option<f64>, clock: Arc<dyn Clock>) -> ClientResult<Self> {
        let min_interval = match min_seconds {
            None => None,
            Some(secs) => {
                let interval = Duration::try_from_secs_f64(secs).map_err(|_| {
                    ClientError::Config(format!(
                        "min seconds between requests must be a non-negative number, got {secs}"
                    ))
                })?;
                (!interval.is_zero()).then_some(interval)
            }
        };
        Ok(Self {
            min_interval,
            last_start: Mutex::new(None),
            clock,
        })
    }

    /// The enforced interval, if pacing is enabled.
    pub fn min_interval(&self) -> Option<Duration> {
        self.min_interval
    }

    /// Waits for the caller's turn and records the start of its request.
    ///
    /// Returns the instant the request is allowed to start.
    pub async fn acquire(&self) -> Instant {
        let Some(min_interval) = self.min_interval else {
            return self.clock.now();
        };

        let mut last_start = self.last_start.lock().await;
        if let Some(previous) = *last_start {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                debug!("Rate limit: waiting {:?} before next request", wait);
                self.clock.sleep(wait).await;
            }
        }
        let start = self.clock.now();
        *last_start = Some(start);
        start
    }
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("min_interval", &self.min_interval)
            .finish_non_exhaustive()
    }
}
