//! Bounded token reservoir modeling the remote API's rate limit.
//!
//! Every outbound request consumes a token via [`RequestBudget::acquire`]
//! before it is issued, and every response (success or failure) is fed back
//! through [`RequestBudget::observe`] so the reservoir tracks what the server
//! actually advertises. When the reservoir is empty, acquirers park on the
//! reset timer or on the next observation, whichever comes first. A single
//! probe request is allowed past the reset boundary so the next observation
//! can refresh the budget even when the local clock and the server disagree
//! about the exact reset instant.

use http::HeaderMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{
    sync::watch,
    time::{sleep_until, Instant},
};
use tokio_util::sync::CancellationToken;

/// Header carrying a server-mandated pause, in whole seconds.
pub const RETRY_AFTER: &str = "retry-after";
/// Header carrying the remaining request quota.
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// Header carrying the quota reset instant, in epoch seconds.
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Settings for the [`RequestBudget`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetConfig {
    /// Tokens assumed available before the first server observation.
    ///
    /// Default is 5000.
    pub initial_remaining: u64,
    /// Window after which the reservoir is believed to replenish.
    ///
    /// Default is 1 hour.
    #[serde(with = "humantime_serde")]
    pub reset_window: Duration,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        BudgetConfig { initial_remaining: 5000, reset_window: Duration::from_secs(60 * 60) }
    }
}

/// Errors returned by [`RequestBudget::acquire`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BudgetError {
    /// `acquire` was called with a zero token count.
    #[error("token count must be greater than zero")]
    InvalidTokenCount,
    /// The caller was cancelled while waiting for tokens.
    #[error("budget acquisition cancelled")]
    Cancelled,
}

struct BudgetState {
    remaining: u64,
    reset_at: Instant,
    /// Last reset value seen from the server, used to detect changes.
    reset_epoch: Option<u64>,
    probed: bool,
    cooldown_until: Instant,
}

struct BudgetInner {
    state: Mutex<BudgetState>,
    /// Bumped on every observable state change; wakes all parked acquirers.
    signal: watch::Sender<u64>,
}

enum Wait {
    Until(Instant),
    Signal,
}

/// Token reservoir tracking the remaining remote API quota.
///
/// Cloning is cheap; all clones share one reservoir.
#[derive(Clone)]
pub struct RequestBudget {
    inner: Arc<BudgetInner>,
}

impl fmt::Debug for RequestBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBudget").field("remaining", &self.remaining()).finish()
    }
}

impl Default for RequestBudget {
    fn default() -> Self {
        Self::new(BudgetConfig::default())
    }
}

impl RequestBudget {
    /// Creates a reservoir with `initial_remaining` tokens that is believed
    /// to replenish one `reset_window` from now.
    pub fn new(config: BudgetConfig) -> Self {
        let now = Instant::now();
        let (signal, _) = watch::channel(0);
        Self {
            inner: Arc::new(BudgetInner {
                state: Mutex::new(BudgetState {
                    remaining: config.initial_remaining,
                    reset_at: now + config.reset_window,
                    reset_epoch: None,
                    probed: false,
                    cooldown_until: now,
                }),
                signal,
            }),
        }
    }

    /// Current token count.
    pub fn remaining(&self) -> u64 {
        self.inner.state.lock().remaining
    }

    /// Reserves `tokens` tokens, blocking while the reservoir is exhausted
    /// or a server-mandated cooldown is in effect.
    ///
    /// Cancellation aborts the wait without consuming anything.
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
        tokens: u32,
    ) -> Result<(), BudgetError> {
        if tokens == 0 {
            return Err(BudgetError::InvalidTokenCount);
        }
        for _ in 0..tokens {
            self.acquire_one(cancel).await?;
        }
        Ok(())
    }

    async fn acquire_one(&self, cancel: &CancellationToken) -> Result<(), BudgetError> {
        let mut signal = self.inner.signal.subscribe();
        loop {
            // Arm the signal before inspecting state so an observation
            // between the inspection and the wait is not missed.
            signal.borrow_and_update();
            let wait = {
                let mut state = self.inner.state.lock();
                let now = Instant::now();
                if now < state.cooldown_until {
                    Wait::Until(state.cooldown_until)
                } else if state.remaining > 0 {
                    state.remaining -= 1;
                    metrics::counter!("repolens_budget_tokens_acquired", 1);
                    return Ok(());
                } else if now >= state.reset_at && !state.probed {
                    // One free request past the reset boundary; its response
                    // is expected to refresh the budget via `observe`.
                    state.probed = true;
                    metrics::counter!("repolens_budget_probe_grants", 1);
                    tracing::debug!(target: "budget", "granting probe token past reset boundary");
                    return Ok(());
                } else if now >= state.reset_at {
                    Wait::Signal
                } else {
                    Wait::Until(state.reset_at)
                }
            };
            match wait {
                Wait::Until(deadline) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(BudgetError::Cancelled),
                        _ = sleep_until(deadline) => {}
                        changed = signal.changed() => {
                            let _ = changed;
                        }
                    }
                }
                Wait::Signal => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(BudgetError::Cancelled),
                        changed = signal.changed() => {
                            let _ = changed;
                        }
                    }
                }
            }
        }
    }

    /// Updates the reservoir from the rate-limit headers of a response.
    ///
    /// `Retry-After` (seconds, >= 1) only ever pushes the cooldown deadline
    /// further out; `X-RateLimit-Remaining` and `X-RateLimit-Reset` overwrite
    /// the local belief when they differ from it. Any change clears the probe
    /// flag and wakes every parked acquirer. Malformed headers are ignored.
    pub fn observe(&self, headers: &HeaderMap) {
        let retry_after = parse_header(headers, RETRY_AFTER).filter(|secs| *secs >= 1);
        let remaining = parse_header(headers, RATE_LIMIT_REMAINING);
        let reset = parse_header(headers, RATE_LIMIT_RESET).filter(|epoch| *epoch > 0);
        if retry_after.is_none() && remaining.is_none() && reset.is_none() {
            return;
        }

        let mut state = self.inner.state.lock();
        let now = Instant::now();
        let mut changed = false;
        if let Some(secs) = retry_after {
            let until = now + Duration::from_secs(secs);
            if until > state.cooldown_until {
                state.cooldown_until = until;
                changed = true;
            }
        }
        if let Some(value) = remaining {
            if value != state.remaining {
                state.remaining = value;
                changed = true;
            }
        }
        if let Some(epoch) = reset {
            if state.reset_epoch != Some(epoch) {
                state.reset_epoch = Some(epoch);
                state.reset_at = now + delay_until_epoch(epoch);
                changed = true;
            }
        }
        if changed {
            state.probed = false;
            tracing::trace!(
                target: "budget",
                remaining = state.remaining,
                "budget updated from response headers"
            );
            // Wake everyone while still holding the lock: at most one wakeup
            // storm per observable change.
            self.inner.signal.send_modify(|epoch| *epoch += 1);
        }
    }
}

fn parse_header(headers: &HeaderMap, name: &str) -> Option<u64> {
    let value = headers.get(name)?.to_str().ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::trace!(target: "budget", header = name, value, "ignoring malformed header");
            None
        }
    }
}

fn delay_until_epoch(epoch: u64) -> Duration {
    let now_unix =
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    Duration::from_secs(epoch.saturating_sub(now_unix))
}
