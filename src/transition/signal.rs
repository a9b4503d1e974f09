//! Write-once completion signals.

use std::fmt;
use tokio::sync::watch;

/// A value settled at most once and awaitable by any number of observers.
pub struct Signal<T: Clone> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> Signal<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Settle the signal. Later calls are ignored and return false.
    pub fn settle(&self, value: T) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        })
    }

    /// The settled value, if any.
    pub fn peek(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Wait until the signal settles.
    pub async fn wait(&self) -> Option<T> {
        let mut rx = self.tx.subscribe();
        let settled = rx.wait_for(Option::is_some).await.ok()?;
        settled.clone()
    }
}

impl<T: Clone> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("settled", &self.is_settled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_settle_wins() {
        let signal = Signal::new();

        assert!(signal.settle(1));
        assert!(!signal.settle(2));
        assert_eq!(signal.peek(), Some(1));
    }

    #[tokio::test]
    async fn waiters_observe_later_settlement() {
        let signal = Arc::new(Signal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait().await })
        };

        tokio::task::yield_now().await;
        signal.settle("done");

        assert_eq!(waiter.await.unwrap(), Some("done"));
    }

    #[tokio::test]
    async fn wait_on_settled_signal_returns_immediately() {
        let signal = Signal::new();
        signal.settle(5u8);
        assert_eq!(signal.wait().await, Some(5));
    }
}
