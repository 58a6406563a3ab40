//! Warning sink for benign reconciliation notices
//!
//! The only message controllers emit through this contract is the
//! "already deleted" notice on idempotent deletes.

use std::fmt;

/// Logger collaborator
pub trait Logger: Send + Sync {
    /// Emit a warning-level message
    fn warning(&self, message: fmt::Arguments<'_>);
}

/// Forwards warnings to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn warning(&self, message: fmt::Arguments<'_>) {
        tracing::warn!("{}", message);
    }
}
