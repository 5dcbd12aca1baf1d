//! Push scheduling
//!
//! Every mutation asks for a push without waiting for it. The store only knows the
//! [`SyncScheduler`] trait; the sync engine owns the receiving end.

use tokio::sync::mpsc;

/// Fire-and-forget request for a push of the current store contents
pub trait SyncScheduler: Send + Sync {
    fn schedule_push(&self);
}

/// Discards every request. Used when sync is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScheduler;

impl SyncScheduler for NoopScheduler {
    fn schedule_push(&self) {}
}

/// Forwards requests over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelScheduler {
    tx: mpsc::UnboundedSender<()>,
}

impl ChannelScheduler {
    /// Creates the scheduler and the receiving end for the push worker
    pub fn new() -> (Self, PushSignals) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, PushSignals { rx })
    }
}

impl SyncScheduler for ChannelScheduler {
    fn schedule_push(&self) {
        if self.tx.send(()).is_err() {
            log::debug!("Push requested but no worker is listening");
        }
    }
}

/// Receiving end of a [`ChannelScheduler`]
#[derive(Debug)]
pub struct PushSignals {
    rx: mpsc::UnboundedReceiver<()>,
}

impl PushSignals {
    /// Waits for the next request; `None` once every scheduler is gone
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Consumes everything queued right now and returns how many requests there were
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_counts_requests() {
        let (scheduler, mut signals) = ChannelScheduler::new();
        scheduler.schedule_push();
        scheduler.schedule_push();
        scheduler.schedule_push();

        assert_eq!(signals.drain(), 3);
        assert_eq!(signals.drain(), 0);
    }

    #[tokio::test]
    async fn test_recv_ends_when_scheduler_dropped() {
        let (scheduler, mut signals) = ChannelScheduler::new();
        scheduler.schedule_push();
        drop(scheduler);

        assert_eq!(signals.recv().await, Some(()));
        assert_eq!(signals.recv().await, None);
    }

    #[test]
    fn test_send_without_receiver_does_not_panic() {
        let (scheduler, signals) = ChannelScheduler::new();
        drop(signals);
        scheduler.schedule_push();
        NoopScheduler.schedule_push();
    }
}
