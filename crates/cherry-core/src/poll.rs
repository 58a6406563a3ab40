//! Convergence poller
//!
//! Remote state transitions (address provisioning, server assignment) are
//! asynchronous. The [`Poller`] re-runs a probe until it reports success,
//! fails, or the surrounding [`Context`] stops.
//!
//! ## Timing
//!
//! ```text
//! probe ── not done ──► sleep(delay + jitter) ──► probe ── ... ──► done | error
//!   ▲                          │
//!   └── skipped when the ──────┴── context stops ──► Error::Cancelled
//!       context is already stopped
//! ```
//!
//! Jitter is drawn uniformly from `[min, max)` on every wait so concurrent
//! operations started together do not poll the API in lockstep.

use crate::context::Context;
use crate::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Default constant delay between attempts
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// Default lower jitter bound (inclusive)
pub const DEFAULT_JITTER_MIN: Duration = Duration::from_secs(1);

/// Default upper jitter bound (exclusive)
pub const DEFAULT_JITTER_MAX: Duration = Duration::from_secs(2);

/// Half-open interval `[min, max)` random jitter is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterInterval {
    min: Duration,
    max: Duration,
}

impl JitterInterval {
    /// Create an interval, rejecting `min > max`
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidInterval {
                min: format!("{:?}", min),
                max: format!("{:?}", max),
            });
        }
        Ok(Self { min, max })
    }

    /// Create an interval from signed millisecond bounds
    ///
    /// Rejects negative bounds as well as `min > max`.
    pub fn from_millis(min: i64, max: i64) -> Result<Self> {
        if min < 0 || max < 0 || min > max {
            return Err(Error::InvalidInterval {
                min: format!("{}ms", min),
                max: format!("{}ms", max),
            });
        }
        Self::new(
            Duration::from_millis(min.unsigned_abs()),
            Duration::from_millis(max.unsigned_abs()),
        )
    }

    /// Lower bound
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a jitter value
    ///
    /// An empty interval (`min == max`) always yields `min`.
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..self.max)
    }
}

impl Default for JitterInterval {
    fn default() -> Self {
        Self {
            min: DEFAULT_JITTER_MIN,
            max: DEFAULT_JITTER_MAX,
        }
    }
}

/// Retry-until-condition primitive with constant delay plus jitter
#[derive(Debug, Clone)]
pub struct Poller {
    delay: Duration,
    jitter: JitterInterval,
}

impl Poller {
    /// Create a poller
    pub fn new(delay: Duration, jitter: JitterInterval) -> Self {
        Self { delay, jitter }
    }

    /// Constant part of the wait between attempts
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Jitter interval added to every wait
    pub fn jitter(&self) -> JitterInterval {
        self.jitter
    }

    fn next_wait(&self) -> Duration {
        self.delay + self.jitter.sample()
    }

    /// Poll `probe` until it returns `Ok(true)` or an error
    ///
    /// The first attempt runs immediately unless `ctx` is already stopped,
    /// in which case the probe is never invoked. A stop observed while
    /// waiting aborts with [`Error::Cancelled`]; this is the only way polling
    /// ends without the probe's own result.
    pub async fn until<F, Fut>(&self, ctx: &Context, mut probe: F) -> Result<()>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        if let Some(cause) = ctx.err() {
            return Err(Error::Cancelled(cause));
        }

        let mut attempt: u32 = 1;
        loop {
            if probe(ctx.clone()).await? {
                debug!(attempt, "condition fulfilled");
                return Ok(());
            }

            let wait = self.next_wait();
            debug!(attempt, ?wait, "condition not fulfilled, waiting");

            tokio::select! {
                biased;
                cause = ctx.done() => return Err(Error::Cancelled(cause)),
                _ = tokio::time::sleep(wait) => {}
            }

            attempt += 1;
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY, JitterInterval::default())
    }
}
