//! Cancellation and deadline scope threaded through every remote call and
//! wait loop.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::ProvisionError;

/// Caller-owned cancellation token plus an optional deadline.
///
/// Cloning a context shares the token. [`Context::with_timeout`] derives a
/// child whose cancellation does not propagate back to the parent, while
/// cancelling the parent still reaches the child.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a context with a fresh token and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing cancellation token.
    #[must_use]
    pub const fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derives a child context expiring after `timeout`, or at the parent's
    /// deadline when that comes first.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a child context expiring at `deadline`, or at the parent's
    /// deadline when that comes first.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let effective = self
            .deadline
            .map_or(deadline, |current| current.min(deadline));
        Self {
            token: self.token.child_token(),
            deadline: Some(effective),
        }
    }

    /// Cancels this context and every child derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Borrows the underlying token, for callers wiring their own tasks.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fails fast when the context is cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Cancelled`] or
    /// [`ProvisionError::DeadlineExceeded`].
    pub fn check(&self, action: &str) -> Result<(), ProvisionError> {
        if self.token.is_cancelled() {
            return Err(ProvisionError::Cancelled {
                action: action.to_owned(),
            });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(ProvisionError::DeadlineExceeded {
                action: action.to_owned(),
            });
        }
        Ok(())
    }

    /// Sleeps for `duration` unless the context is cancelled or expires first.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Cancelled`] or
    /// [`ProvisionError::DeadlineExceeded`] as soon as either happens.
    pub async fn sleep(&self, duration: Duration, action: &str) -> Result<(), ProvisionError> {
        let wake = Instant::now() + duration;
        match self.deadline {
            Some(deadline) if deadline <= wake => {
                tokio::select! {
                    () = self.token.cancelled() => Err(ProvisionError::Cancelled {
                        action: action.to_owned(),
                    }),
                    () = sleep_until(deadline) => Err(ProvisionError::DeadlineExceeded {
                        action: action.to_owned(),
                    }),
                }
            }
            _ => {
                tokio::select! {
                    () = self.token.cancelled() => Err(ProvisionError::Cancelled {
                        action: action.to_owned(),
                    }),
                    () = sleep_until(wake) => Ok(()),
                }
            }
        }
    }
}
