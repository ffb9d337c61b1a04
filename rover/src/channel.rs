//! Bounded single-consumer channels and boolean signals shared between tasks

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch, Mutex,
};
use tracing::{debug, trace};

/// Bounded FIFO carrying one message type.
///
/// Producers on the serial read path use the non-blocking [Channel::try_push]
/// or [Channel::publish_latest]; only command producers wait for space.
#[derive(Debug)]
pub struct Channel<T> {
    name: &'static str,
    tx: mpsc::Sender<T>,
    rx: Mutex<mpsc::Receiver<T>>,
}

impl<T> Channel<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            name,
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Enqueue without waiting. A full channel drops `item`.
    pub fn try_push(&self, item: T) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!(channel = self.name, "channel full, dropping newest item");
                false
            },
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Enqueue without waiting, superseding whatever is still queued.
    pub fn publish_latest(&self, item: T) {
        let item = match self.tx.try_send(item) {
            Ok(()) => return,
            Err(TrySendError::Full(item)) => item,
            Err(TrySendError::Closed(_)) => return,
        };
        // A consumer parked in recv() holds the lock, but then the queue is empty.
        if let Ok(mut rx) = self.rx.try_lock() {
            while rx.try_recv().is_ok() {}
        }
        if self.tx.try_send(item).is_err() {
            trace!(channel = self.name, "could not supersede queued item");
        }
    }

    /// Enqueue, waiting for free capacity
    pub async fn push(&self, item: T) -> Result<(), mpsc::error::SendError<T>> {
        self.tx.send(item).await
    }

    /// Wait for the next item
    pub async fn recv(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }

    /// Discard everything currently queued, returning how many items were dropped.
    ///
    /// A consumer parked in [Channel::recv] holds the receiver. The drain is
    /// skipped then and the next item goes to that consumer.
    pub fn drain(&self) -> usize {
        let Ok(mut rx) = self.rx.try_lock() else {
            debug!(channel = self.name, "consumer waiting, flush skipped");
            return 0;
        };
        let mut dropped = 0;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            trace!(channel = self.name, dropped, "flushed stale items");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.tx.capacity() == 0
    }
}

/// A boolean flag tasks can wait on
#[derive(Debug)]
pub struct Signal {
    tx: watch::Sender<bool>,
}

impl Signal {
    pub fn new(initial: bool) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    pub fn clear(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait_set(&self) {
        self.wait_for(true).await
    }

    pub async fn wait_cleared(&self) {
        self.wait_for(false).await
    }

    async fn wait_for(&self, state: bool) {
        let mut rx = self.tx.subscribe();
        // the sender lives as long as self, so this cannot fail
        let _ = rx.wait_for(|v| *v == state).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};

    #[tokio::test]
    async fn full_channel_drops_newest() {
        let ch = Channel::new("test", 2);
        assert!(ch.try_push(1));
        assert!(ch.try_push(2));
        assert!(ch.is_full());
        assert!(!ch.try_push(3));
        assert_eq!(ch.recv().await, Some(1));
        assert_eq!(ch.recv().await, Some(2));
        assert!(ch.is_empty());
    }

    #[tokio::test]
    async fn publish_latest_supersedes() {
        let ch = Channel::new("gga", 1);
        ch.publish_latest("old");
        ch.publish_latest("new");
        assert_eq!(ch.len(), 1);
        assert_eq!(ch.recv().await, Some("new"));
    }

    #[tokio::test]
    async fn publish_latest_reaches_parked_consumer() {
        let ch = Arc::new(Channel::new("gga", 1));
        let consumer = {
            let ch = ch.clone();
            tokio::spawn(async move { ch.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        ch.publish_latest(7);
        assert_eq!(consumer.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn drain_empties() {
        let ch = Channel::new("cfg", 5);
        for i in 0..4 {
            ch.try_push(i);
        }
        assert_eq!(ch.drain(), 4);
        assert!(ch.is_empty());
        assert_eq!(ch.drain(), 0);
    }

    #[tokio::test]
    async fn drain_skips_parked_consumer() {
        let ch = Arc::new(Channel::new("ack", 5));
        let consumer = {
            let ch = ch.clone();
            tokio::spawn(async move { ch.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ch.drain(), 0);
        assert!(ch.try_push(3));
        assert_eq!(consumer.await.unwrap(), Some(3));
        assert!(ch.is_empty());
    }

    #[tokio::test]
    async fn signal_wakes_waiters() {
        let sig = Arc::new(Signal::new(true));
        assert!(sig.is_set());
        let waiter = {
            let sig = sig.clone();
            tokio::spawn(async move { sig.wait_cleared().await })
        };
        tokio::task::yield_now().await;
        sig.clear();
        waiter.await.unwrap();
        assert!(!sig.is_set());
        // already in the wanted state
        sig.wait_cleared().await;
    }
}
