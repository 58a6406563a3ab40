//! Cooperative cancellation for provider operations
//!
//! A [`Context`] travels with every controller call. It can be cancelled
//! explicitly through its [`CancelHandle`] or expire at a deadline; the
//! poller and guarded remote calls observe it at their suspension points.
//!
//! ```rust,no_run
//! use cherry_core::context::Context;
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let (ctx, handle) = Context::with_cancel();
//! let ctx = ctx.with_timeout(Duration::from_secs(300));
//!
//! tokio::spawn(async move {
//!     tokio::time::sleep(Duration::from_secs(5)).await;
//!     handle.cancel("operator interrupt");
//! });
//!
//! let cause = ctx.done().await;
//! println!("stopped: {cause}");
//! # }
//! ```

use crate::error::{Error, Result};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelCause {
    /// Cancelled through a [`CancelHandle`]
    Cancelled(String),
    /// The context deadline passed
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Cancelled(reason) => write!(f, "context canceled: {}", reason),
            CancelCause::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

type CancelSlot = Option<CancelCause>;

/// Cancellation token passed into controller operations
///
/// Clones share the same cancellation state. Create one context per
/// operation; reusing a token across unrelated operations couples their
/// lifetimes.
#[derive(Debug, Clone)]
pub struct Context {
    cancel: Option<watch::Receiver<CancelSlot>>,
    deadline: Option<Instant>,
}

/// Owner side of a cancellable [`Context`]
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<CancelSlot>,
}

impl CancelHandle {
    /// Cancel every clone of the paired context
    ///
    /// Only the first cause is kept; later calls are no-ops.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(CancelCause::Cancelled(reason));
            true
        });
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self {
            cancel: None,
            deadline: None,
        }
    }

    /// A context paired with a handle that cancels it
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(None);
        let ctx = Self {
            cancel: Some(rx),
            deadline: None,
        };
        (ctx, CancelHandle { tx })
    }

    /// Attach a deadline, keeping the earlier one if already set
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Attach a deadline `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The cancellation cause, or `None` while the context is live
    pub fn err(&self) -> Option<CancelCause> {
        if let Some(rx) = &self.cancel {
            let current = rx.borrow().clone();
            if current.is_some() {
                return current;
            }
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    /// Whether the context has been cancelled or expired
    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Resolve once the context is cancelled or expired
    pub async fn done(&self) -> CancelCause {
        let cancelled = wait_cancelled(self.cancel.clone());

        match self.deadline {
            Some(deadline) => tokio::select! {
                cause = cancelled => cause,
                _ = tokio::time::sleep_until(deadline) => CancelCause::DeadlineExceeded,
            },
            None => cancelled.await,
        }
    }

    /// Run `fut` unless the context stops first
    pub async fn guard<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        if let Some(cause) = self.err() {
            return Err(Error::Cancelled(cause));
        }

        tokio::select! {
            biased;
            cause = self.done() => Err(Error::Cancelled(cause)),
            out = fut => Ok(out),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

async fn wait_cancelled(rx: Option<watch::Receiver<CancelSlot>>) -> CancelCause {
    let Some(mut rx) = rx else {
        return std::future::pending().await;
    };

    loop {
        let current = rx.borrow_and_update().clone();
        if let Some(cause) = current {
            return cause;
        }

        // Handle dropped without cancelling: the context can no longer stop.
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
