//! Caller-driven cancellation of an in-flight cycle

use tokio::sync::watch;

/// Owner side; flips the shared flag
#[derive(Debug)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

/// Observer side handed to the engine; cheap to clone
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/signal pair
pub fn cancellation_pair() -> (CancellationHandle, CancellationSignal) {
    let (tx, rx) = watch::channel(false);
    (CancellationHandle { tx }, CancellationSignal { rx })
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Another signal observing this handle
    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancellationSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled; pends forever if the handle was dropped first
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (handle, signal) = cancellation_pair();
        assert!(!signal.is_cancelled());

        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.cancelled().await }
        });
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(signal.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_does_not_fire() {
        let signal = CancellationSignal::never();
        let fired = tokio::time::timeout(Duration::from_secs(10), signal.cancelled()).await;
        assert!(fired.is_err());
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_subscribed_signal_sees_cancel() {
        let (handle, _signal) = cancellation_pair();
        let second = handle.signal();
        handle.cancel();
        assert!(second.is_cancelled());
        second.cancelled().await;
    }
}
