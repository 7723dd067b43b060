//! Process-wide shutdown signal.
//!
//! One [`ShutdownHandle`] is created at startup and cloned into every
//! long-lived task (event consumer, sweeper, HTTP server). Triggering it
//! makes all of them wind down at their next suspension point.

use tokio::sync::watch;

/// Clonable handle for triggering and observing shutdown.
#[derive(Clone)]
pub struct ShutdownHandle {
    sender: watch::Sender<bool>,
    receiver: watch::Receiver<bool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self { sender, receiver }
    }

    /// Signal all holders to shut down.
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
    }

    /// Whether shutdown has been signaled.
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown is signaled. Also resolves if every sender is
    /// gone, so tasks never wait on a signal that can no longer arrive.
    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow() {
                return;
            }
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_not_shut_down() {
        let handle = ShutdownHandle::new();
        assert!(!handle.is_shutdown());
    }

    #[test]
    fn trigger_is_visible_to_clones() {
        let handle = ShutdownHandle::new();
        let clone = handle.clone();
        handle.shutdown();
        assert!(clone.is_shutdown());
    }

    #[tokio::test]
    async fn wait_resolves_after_trigger() {
        let handle = ShutdownHandle::new();
        let waiter = handle.clone();

        let task = tokio::spawn(async move { waiter.wait().await });
        handle.shutdown();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("wait did not resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn wait_resolves_immediately_when_already_shut_down() {
        let handle = ShutdownHandle::new();
        handle.shutdown();
        tokio::time::timeout(Duration::from_millis(100), handle.wait())
            .await
            .expect("wait did not resolve");
    }
}
