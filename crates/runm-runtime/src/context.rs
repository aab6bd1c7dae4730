//! Cancellation and deadlines for lifecycle operations.
//!
//! A [`Context`] is handed to `start` by the dispatcher. Blocking steps are
//! raced against it so a cancelled or expired context stops the launch
//! instead of stalling the caller.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, RuntimeError};

/// Cancellation token plus optional deadline.
///
/// Cloning a context shares its token: cancelling any clone cancels all.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// A fresh context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Returns a handle that can cancel this context from another thread.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fails if the context is already cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` or `DeadlineExceeded`.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(RuntimeError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drives `fut` to completion unless the context ends first.
    ///
    /// When the context wins, `fut` is dropped without being polled again.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` or `DeadlineExceeded` if the context ends before
    /// `fut` completes.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        self.check()?;
        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(RuntimeError::Cancelled),
            () = expiry => Err(RuntimeError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
