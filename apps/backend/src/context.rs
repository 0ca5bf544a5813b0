//! Explicit call context carried through handlers, use cases and repositories.
//!
//! A `Context` bundles a cancellation signal, an optional deadline and a set
//! of typed values. Deriving a child never mutates the parent. Values are
//! keyed by their Rust type, so two modules can never collide on a key.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::errors::ErrorCode;

/// Why a context is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    #[error("context canceled")]
    Canceled,
}

impl From<ContextError> for AppError {
    fn from(e: ContextError) -> Self {
        match e {
            ContextError::DeadlineExceeded => AppError::timeout().with_source(e),
            ContextError::Canceled => {
                AppError::internal(ErrorCode::Internal, "context canceled", e)
            }
        }
    }
}

type Values = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

#[derive(Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    values: Arc<Values>,
}

/// Cancels the derived context when dropped.
#[must_use = "dropping the guard cancels the derived context"]
pub struct CancelGuard {
    token: CancellationToken,
}

impl CancelGuard {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// Root context: no deadline, never cancelled, no values.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            values: Arc::new(HashMap::new()),
        }
    }

    fn child(&self, deadline: Option<Instant>) -> (Self, CancelGuard) {
        let token = self.token.child_token();
        let ctx = Self {
            token: token.clone(),
            deadline,
            values: Arc::clone(&self.values),
        };
        (ctx, CancelGuard { token })
    }

    pub fn with_cancel(&self) -> (Self, CancelGuard) {
        self.child(self.deadline)
    }

    /// Child whose deadline is the earlier of the parent's and `now + timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> (Self, CancelGuard) {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };
        self.child(Some(deadline))
    }

    /// Child carrying `value`; replaces any value of the same type.
    pub fn with_value<T>(&self, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        let mut values: Values = (*self.values).clone();
        values.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            token: self.token.clone(),
            deadline: self.deadline,
            values: Arc::new(values),
        }
    }

    pub fn value<T>(&self) -> Option<&T>
    where
        T: Any + Send + Sync,
    {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn err(&self) -> Option<ContextError> {
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        if expired {
            Some(ContextError::DeadlineExceeded)
        } else if self.token.is_cancelled() {
            Some(ContextError::Canceled)
        } else {
            None
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the context is cancelled or its deadline elapses.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => self.err().unwrap_or(ContextError::Canceled),
                    _ = sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }

    /// Drive `fut` unless the context finishes first.
    pub async fn run_until_done<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.deadline)
            .field("cancelled", &self.token.is_cancelled())
            .field("values", &self.values.len())
            .finish()
    }
}
