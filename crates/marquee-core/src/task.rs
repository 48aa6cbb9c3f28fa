//! Cancellable deferred results
//!
//! A [`CancellableTask`] is a one-shot slot that is resolved, rejected or
//! cancelled exactly once. Consumers hold an [`Outcome`] handle and may stop
//! caring about an in-flight operation by cancelling; the implementor of the
//! operation only sees the [`CancellationToken`] and is expected, not forced,
//! to observe it.

use crate::{Error, Result};
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Observable status of a task; every state but `Pending` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Resolved,
    Rejected,
    Cancelled,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Resolved => write!(f, "resolved"),
            TaskStatus::Rejected => write!(f, "rejected"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

struct Shared<T> {
    outcome: Mutex<Option<Result<T>>>,
    status: watch::Sender<TaskStatus>,
    token: CancellationToken,
}

impl<T> Shared<T> {
    fn slot(&self) -> MutexGuard<'_, Option<Result<T>>> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the outcome if the task is still pending. A token that was
    /// cancelled behind our back wins over the incoming outcome.
    fn settle(&self, status: TaskStatus, result: Result<T>) -> bool {
        let mut slot = self.slot();
        if slot.is_some() {
            return false;
        }
        if status != TaskStatus::Cancelled && self.token.is_cancelled() {
            *slot = Some(Err(Error::Cancelled));
            drop(slot);
            self.status.send_replace(TaskStatus::Cancelled);
            return false;
        }
        *slot = Some(result);
        drop(slot);
        self.status.send_replace(status);
        true
    }

    fn cancel(&self) {
        self.token.cancel();
        self.settle(TaskStatus::Cancelled, Err(Error::Cancelled));
    }

    fn status(&self) -> TaskStatus {
        let status = *self.status.borrow();
        if status == TaskStatus::Pending && self.token.is_cancelled() {
            self.cancel();
            return *self.status.borrow();
        }
        status
    }
}

/// A one-shot deferred result with cooperative cancellation
pub struct CancellableTask<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for CancellableTask<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for CancellableTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellableTask")
            .field("status", &*self.shared.status.borrow())
            .finish()
    }
}

impl<T: Clone> Default for CancellableTask<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> CancellableTask<T> {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Create a task bound to an existing token; an already-triggered token
    /// yields a pre-cancelled task.
    pub fn with_token(token: CancellationToken) -> Self {
        let (status, _) = watch::channel(TaskStatus::Pending);
        let shared = Arc::new(Shared {
            outcome: Mutex::new(None),
            status,
            token,
        });
        if shared.token.is_cancelled() {
            shared.cancel();
        }
        Self { shared }
    }

    /// Resolve the task. Returns false if it had already left `Pending`.
    pub fn resolve(&self, value: T) -> bool {
        self.shared.settle(TaskStatus::Resolved, Ok(value))
    }

    /// Reject the task. Returns false if it had already left `Pending`.
    pub fn reject(&self, error: Error) -> bool {
        self.shared.settle(TaskStatus::Rejected, Err(error))
    }

    /// Cancel the task and trigger its token. Idempotent; every call returns
    /// a handle to the same outcome.
    pub fn cancel(&self) -> Outcome<T> {
        self.shared.cancel();
        self.outcome()
    }

    /// Read-only cancellation token for delegates performing suspending work
    pub fn signal(&self) -> CancellationToken {
        self.shared.token.clone()
    }

    pub fn status(&self) -> TaskStatus {
        self.shared.status()
    }

    pub fn is_pending(&self) -> bool {
        self.status() == TaskStatus::Pending
    }

    pub fn outcome(&self) -> Outcome<T> {
        Outcome {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Shared handle to the single outcome of a [`CancellableTask`]
pub struct Outcome<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Outcome<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outcome")
            .field("status", &*self.shared.status.borrow())
            .finish()
    }
}

impl<T: Clone> Outcome<T> {
    /// True if both handles observe the same task
    pub fn ptr_eq(&self, other: &Outcome<T>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn status(&self) -> TaskStatus {
        self.shared.status()
    }

    /// The outcome if the task has settled
    pub fn try_result(&self) -> Option<Result<T>> {
        self.shared.status();
        self.shared.slot().clone()
    }

    /// Wait for the task to settle. Triggering the task's token while
    /// waiting cancels the task.
    pub async fn wait(&self) -> Result<T> {
        let mut changes = self.shared.status.subscribe();
        loop {
            if let Some(result) = self.try_result() {
                return result;
            }
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        return Err(Error::Internal("task status channel closed".into()));
                    }
                }
                _ = self.shared.token.cancelled() => self.shared.cancel(),
            }
        }
    }
}

impl<T> IntoFuture for Outcome<T>
where
    T: Clone + Send + 'static,
{
    type Output = Result<T>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}
