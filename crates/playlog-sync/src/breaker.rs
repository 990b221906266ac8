//! Circuit breaker with jittered exponential backoff
//!
//! Every remote call goes through [`CircuitBreaker::execute`]. The breaker
//! counts consecutive failures and, once the threshold is reached, fails fast
//! until the open timeout elapses. The first call after that is a trial: its
//! success closes the circuit and fires a recovery notification, its failure
//! reopens it. Other calls are rejected while the trial is in flight; a trial
//! abandoned without an outcome is replaced after another open timeout.
//!
//! ```text
//!            threshold reached               timeout elapsed
//!  Closed ─────────────────────→ Open ─────────────────────→ HalfOpen
//!    ↑                             ↑                            │
//!    │        trial fails          └────────────────────────────┤
//!    └──────────────────────────────────────────────────────────┘
//!                             trial succeeds (recovery notification)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use playlog_sync::breaker::{BreakerSettings, CircuitBreaker};
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new(BreakerSettings::default());
//! let result = breaker
//!     .execute(|| async { Ok::<_, anyhow::Error>(42) }, 3, Duration::from_secs(1))
//!     .await;
//! # }
//! ```

use std::{
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use rand::Rng;
use serde::Serialize;
use tokio::{sync::broadcast, time::Instant};
use tracing::{debug, info, warn};

use playlog_core::config::BreakerConfig;

/// Capacity of the recovery notification channel
const RECOVERY_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// State and settings
// ============================================================================

/// Circuit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Tuning of a [`CircuitBreaker`]
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Time since the last failure before a trial call is allowed
    pub open_timeout: Duration,
    /// Upper bound of the random jitter added to each backoff
    pub max_jitter: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::from(&BreakerConfig::default())
    }
}

impl From<&BreakerConfig> for BreakerSettings {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            open_timeout: config.open_timeout(),
            max_jitter: config.max_jitter(),
        }
    }
}

/// Why [`CircuitBreaker::execute`] did not produce a value
#[derive(Debug, thiserror::Error)]
pub enum BreakerError {
    /// The circuit is open; the operation was not invoked
    #[error("circuit breaker is open")]
    Open,

    /// Every allowed attempt failed; carries the last failure
    #[error("operation failed: {0}")]
    Operation(#[source] anyhow::Error),
}

impl BreakerError {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open)
    }
}

// ============================================================================
// CircuitBreaker
// ============================================================================

/// Mutable state, protected by one lock
#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    /// When the HalfOpen trial call was admitted
    trial_started_at: Option<Instant>,
}

/// Three-state circuit breaker shared by every remote call of a client
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: BreakerSettings,
    inner: Mutex<BreakerInner>,
    recovered_tx: broadcast::Sender<()>,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        let (recovered_tx, _) = broadcast::channel(RECOVERY_CHANNEL_CAPACITY);
        Self {
            settings,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_at: None,
                trial_started_at: None,
            }),
            recovered_tx,
        }
    }

    // The inner state is consistent after every statement, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Subscribes to HalfOpen → Closed transitions
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.recovered_tx.subscribe()
    }

    /// Forces the circuit closed with a zero failure count
    pub fn reset(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!(from = %inner.state, "Circuit breaker manually reset");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure_at = None;
        inner.trial_started_at = None;
    }

    /// Decides whether a call may proceed, moving Open → HalfOpen when due.
    ///
    /// HalfOpen admits one trial at a time.
    fn try_acquire(&self) -> bool {
        let mut inner = self.lock();
        let timeout = self.settings.open_timeout;
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                let trial_running = inner
                    .trial_started_at
                    .is_some_and(|at| at.elapsed() < timeout);
                if trial_running {
                    return false;
                }
                debug!("Previous trial call abandoned, allowing another");
                inner.trial_started_at = Some(Instant::now());
                true
            }
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= timeout {
                    info!("Circuit breaker half-open, allowing trial call");
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_started_at = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
        }
    }

    fn on_success(&self) {
        let recovered = {
            let mut inner = self.lock();
            inner.failure_count = 0;
            inner.trial_started_at = None;
            let recovered = inner.state == CircuitState::HalfOpen;
            inner.state = CircuitState::Closed;
            recovered
        };

        // Sent after the lock is released; the new state is already visible
        if recovered {
            info!("Circuit breaker closed after successful trial call");
            let _ = self.recovered_tx.send(());
        }
    }

    fn on_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure_at = Some(Instant::now());
        inner.trial_started_at = None;

        match inner.state {
            CircuitState::HalfOpen => {
                warn!("Trial call failed, circuit breaker reopened");
                inner.state = CircuitState::Open;
            }
            CircuitState::Closed if inner.failure_count >= self.settings.failure_threshold => {
                warn!(
                    failures = inner.failure_count,
                    "Failure threshold reached, circuit breaker opened"
                );
                inner.state = CircuitState::Open;
            }
            _ => {}
        }
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt + jitter`
    fn backoff_delay(&self, attempt: u32, base_delay: Duration) -> Duration {
        let exponential = base_delay.saturating_mul(1u32 << attempt.min(16));
        let jitter_ms = u64::try_from(self.settings.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        exponential.saturating_add(jitter)
    }

    /// Runs `operation` up to `max_attempts` times under the breaker.
    ///
    /// A rejection by an open circuit aborts immediately with
    /// [`BreakerError::Open`] and is not counted as a failure. When the last
    /// allowed attempt fails, or a failure opens the circuit, the failure is
    /// returned as [`BreakerError::Operation`].
    pub async fn execute<T, F, Fut>(
        &self,
        mut operation: F,
        max_attempts: u32,
        base_delay: Duration,
    ) -> Result<T, BreakerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let attempts = max_attempts.max(1);

        for attempt in 0..attempts {
            if !self.try_acquire() {
                debug!(attempt, "Circuit breaker open, rejecting call");
                return Err(BreakerError::Open);
            }

            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(attempt, "Operation succeeded after retry");
                    }
                    self.on_success();
                    return Ok(value);
                }
                Err(err) => {
                    self.on_failure();

                    let last = attempt + 1 == attempts;
                    if last || self.state() == CircuitState::Open {
                        warn!(attempt, error = %err, "Operation failed, giving up");
                        return Err(BreakerError::Operation(err));
                    }

                    let delay = self.backoff_delay(attempt, base_delay);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(BreakerError::Operation(anyhow::anyhow!("retry attempts exhausted")))
    }
}

// ============================================================================
// Tests
// ============================================================================
