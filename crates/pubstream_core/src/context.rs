//! Cancellation and deadlines for blocking stream operations.

use crate::error::{StreamError, StreamResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Bounds every wait performed on behalf of a caller.
///
/// A context is cancelled through its token or expires at its deadline,
/// whichever comes first. Clones share the token.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a context that never expires.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context expiring `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_at(Instant::now() + timeout)
    }

    /// Creates a context cancelled through `token`.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Sets the deadline, keeping an earlier one if already set.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Returns a context with a deadline `timeout` from now if this one has
    /// none.
    pub fn or_timeout(&self, timeout: Duration) -> Self {
        match self.deadline {
            Some(_) => self.clone(),
            None => self.clone().deadline_at(Instant::now() + timeout),
        }
    }

    /// Returns a context cancelled with this one but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels the context and every child.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Runs `future` until it completes, the context is cancelled, or the
    /// deadline passes.
    pub async fn run<F: Future>(&self, future: F) -> StreamResult<F::Output> {
        if self.token.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StreamError::Cancelled),
            output = future => Ok(output),
            _ = expiry => Err(StreamError::DeadlineExceeded),
        }
    }
}
