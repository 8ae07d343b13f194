//! Request-scoped cancellation and deadlines
//!
//! The server owns a root `Context` that StopProvider cancels. Every RPC runs
//! with a child of it, so long-running applies observe a stop request.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Context carries cancellation and an optional deadline across async boundaries.
/// Pass it as the first parameter to async trait methods.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done_tx: watch::Sender<bool>,
    parent: Option<Context>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done_tx,
                parent: None,
            }),
        }
    }

    /// A context that is cancelled with its parent, or on its own
    pub fn child(&self) -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline: self.inner.deadline,
                done_tx,
                parent: Some(self.clone()),
            }),
        }
    }

    /// A child context that also expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let deadline = match self.inner.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        let (done_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done_tx,
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.done_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        if *self.inner.done_tx.borrow() {
            return true;
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        self.inner
            .parent
            .as_ref()
            .is_some_and(|parent| parent.is_cancelled())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Resolves once this context, or any ancestor, is cancelled or expired
    pub async fn cancelled(&self) {
        let mut watchers = tokio::task::JoinSet::new();
        let mut current = Some(self);
        while let Some(ctx) = current {
            let mut rx = ctx.inner.done_tx.subscribe();
            watchers.spawn(async move {
                // a dropped sender can never fire, so park forever
                if rx.wait_for(|done| *done).await.is_err() {
                    std::future::pending::<()>().await;
                }
            });
            current = ctx.inner.parent.as_ref();
        }

        let deadline = self.inner.deadline;
        let expired = async move {
            match deadline {
                Some(d) => tokio::time::sleep_until(d.into()).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = expired => {}
            _ = watchers.join_next() => {}
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();
        assert!(!ctx.is_cancelled());

        ctx.cancel();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_parent_cancels_child() {
        let root = Context::new();
        let child = root.child();
        assert!(!child.is_cancelled());

        root.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_child_leaves_parent_running() {
        let root = Context::new();
        let child = root.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!root.is_cancelled());
    }

    #[tokio::test]
    async fn context_timeout_expires() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_cancelled());
        assert!(ctx.deadline().is_some());

        sleep(Duration::from_millis(80)).await;
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_on_parent_cancel() {
        let root = Context::new();
        let child = root.child();

        let waiter = tokio::spawn(async move { child.cancelled().await });
        sleep(Duration::from_millis(10)).await;
        root.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("child should observe cancellation")
            .unwrap();
    }
}
