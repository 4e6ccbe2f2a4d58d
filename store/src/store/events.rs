//! Event counters and subscription dispatch
//!
//! Each declared event owns a monotonically increasing counter and a list
//! of subscriber queues. Triggering an event increments the counter and
//! publishes the new value to every queue; a per-subscription task drains
//! its queue and runs the handler once per published value.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Counter plus subscriber queues for one declared event.
///
/// The counter and the subscriber list live behind a single mutex so that
/// "increment, then publish" is atomic: every subscriber observes counter
/// values in strictly increasing order with no gaps, even when triggers
/// race from multiple tasks.
#[derive(Debug)]
pub(super) struct EventChannel {
    inner: Mutex<ChannelInner>,
}

#[derive(Debug)]
struct ChannelInner {
    count: u64,
    subscribers: Vec<mpsc::UnboundedSender<u64>>,
}

impl EventChannel {
    pub(super) fn new() -> Self {
        Self {
            inner: Mutex::new(ChannelInner {
                count: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Current counter value
    pub(super) fn count(&self) -> u64 {
        self.inner.lock().unwrap().count
    }

    /// Number of live subscriptions
    pub(super) fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }

    /// Increment the counter and publish the new value to every subscriber.
    ///
    /// Returns the new counter value. A send only fails when the receiving
    /// task is gone, so failed sends double as the prune signal.
    pub(super) fn publish(&self) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.count += 1;
        let seq = inner.count;
        inner.subscribers.retain(|tx| tx.send(seq).is_ok());
        seq
    }

    /// Register a new subscription queue and return its receiving end.
    ///
    /// The queue only carries counter values published after this call;
    /// the value current at registration time is never delivered.
    pub(super) fn subscribe(&self) -> mpsc::UnboundedReceiver<u64> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().unwrap().subscribers.push(tx);
        rx
    }
}

/// Spawn the dispatcher task for one subscription.
///
/// The task runs the handler once per value drained from `rx`, in order,
/// and retires once the sending side is gone (queued values drain first).
/// Requires an ambient Tokio runtime.
pub(super) fn spawn_dispatcher<F>(
    event: String,
    mut rx: mpsc::UnboundedReceiver<u64>,
    mut handler: F,
) where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(seq) = rx.recv().await {
            trace!("Running handler for event {} (count {})", event, seq);
            handler();
        }
        debug!("Subscription for event {} retired", event);
    });
}
