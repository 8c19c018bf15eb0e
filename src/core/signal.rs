//! Cooperative cancellation for a resolver run.
//!
//! A [`RunSignal`] is cloned into every worker. It trips when the paired
//! [`CancelHandle`] is used (for example on Ctrl-C) or when the optional
//! deadline passes. Workers either poll [`RunSignal::check`] between steps or
//! race a future against the signal with [`RunSignal::guard`].

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use super::error::ResolverError;

/// Caller-side handle that cancels every clone of its [`RunSignal`].
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Worker-side view of the cancellation state.
#[derive(Debug, Clone)]
pub struct RunSignal {
    cancelled: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl RunSignal {
    /// Create a signal with an optional timeout measured from now.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> (CancelHandle, Self) {
        let (sender, receiver) = watch::channel(false);
        let signal = Self {
            cancelled: receiver,
            deadline: timeout.map(|t| Instant::now() + t),
        };
        (
            CancelHandle {
                sender,
            },
            signal,
        )
    }

    /// A signal that never trips.
    #[must_use]
    pub fn never() -> Self {
        let (_handle, signal) = Self::new(None);
        signal
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with [`ResolverError::Cancelled`] if the signal has tripped.
    pub fn check(&self) -> Result<(), ResolverError> {
        if *self.cancelled.borrow() {
            return Err(ResolverError::cancelled("cancelled by caller"));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ResolverError::cancelled("deadline exceeded"));
        }
        Ok(())
    }

    /// Run `future` to completion unless the signal trips first.
    pub async fn guard<F, T>(&self, future: F) -> Result<T, ResolverError>
    where
        F: Future<Output = T>,
    {
        self.check()?;
        let mut cancelled = self.cancelled.clone();

        tokio::select! {
            biased;
            () = wait_for_cancel(&mut cancelled) => {
                Err(ResolverError::cancelled("cancelled by caller"))
            }
            () = wait_for_deadline(self.deadline) => {
                Err(ResolverError::cancelled("deadline exceeded"))
            }
            value = future => Ok(value),
        }
    }
}

async fn wait_for_cancel(receiver: &mut watch::Receiver<bool>) {
    loop {
        if *receiver.borrow_and_update() {
            return;
        }
        // Sender dropped: the flag can no longer change.
        if receiver.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
