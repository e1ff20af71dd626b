//! Cooperative cancellation for model queries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::ModelError;

/// Shared cancellation flag with an optional deadline.
///
/// Clones share the flag. [`CancelToken::with_timeout`] derives a token
/// that is cancelled when the parent is, and additionally expires on its
/// own deadline.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    started: Instant,
    deadline: Option<Instant>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// A token that never expires unless cancelled.
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
            deadline: None,
        }
    }

    /// Derive a token sharing this flag that also expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let started = Instant::now();
        let own = started + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < own => parent,
            _ => own,
        };
        Self {
            flag: Arc::clone(&self.flag),
            started,
            deadline: Some(deadline),
        }
    }

    /// Request cancellation of every token sharing this flag.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail if cancelled or past the deadline.
    pub fn check(&self) -> Result<(), ModelError> {
        if self.is_cancelled() {
            return Err(ModelError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            let now = Instant::now();
            if now >= deadline {
                return Err(ModelError::TimedOut {
                    elapsed: now.duration_since(self.started),
                });
            }
        }
        Ok(())
    }
}
