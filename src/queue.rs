//! Hand-off between the transport task and the sequential dispatch loop.
//!
//! The transport side only pushes; everything slow (subprocesses, prompts,
//! ledger writes) happens on the consumer side, one item at a time.
//!
//! # Example
//!
//! ```
//! use dvrflow::queue::work_queue;
//! use std::time::Duration;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let (handle, queue) = work_queue::<u32>(Duration::from_millis(10));
//!     handle.push(1);
//!     handle.push(2);
//!     drop(handle);
//!
//!     let mut seen = Vec::new();
//!     queue.run(|item| { seen.push(item); async {} }).await;
//!     assert_eq!(seen, [1, 2]);
//! });
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Producer handle. Cheap to clone; pushing never blocks.
#[derive(Debug)]
pub struct QueueHandle<T> {
    sender: mpsc::UnboundedSender<T>,
}

impl<T> Clone for QueueHandle<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> QueueHandle<T> {
    /// Enqueue an item. Returns `false` once the consumer has gone away.
    pub fn push(&self, item: T) -> bool {
        self.sender.send(item).is_ok()
    }
}

/// Consumer side of the queue.
#[derive(Debug)]
pub struct WorkQueue<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
}

/// Create a queue whose consumer wakes at least every `poll_interval` to
/// look at the shutdown signal.
pub fn work_queue<T>(poll_interval: Duration) -> (QueueHandle<T>, WorkQueue<T>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        QueueHandle { sender },
        WorkQueue {
            receiver,
            shutdown: Arc::new(AtomicBool::new(false)),
            poll_interval,
        },
    )
}

impl<T> WorkQueue<T> {
    /// Signal that, once set, ends the queue as soon as it is empty.
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Number of items waiting.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Wait for the next item.
    ///
    /// Returns `None` when shutdown is signalled and nothing is queued, or
    /// when every producer handle is gone and the queue is drained. Items
    /// queued before shutdown are still returned.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            match tokio::time::timeout(self.poll_interval, self.receiver.recv()).await {
                Ok(Some(item)) => return Some(item),
                Ok(None) => {
                    tracing::debug!("All producers gone and queue drained");
                    return None;
                }
                Err(_) => {
                    if self.shutdown.load(Ordering::SeqCst) && self.receiver.is_empty() {
                        tracing::debug!("Shutdown signalled and queue drained");
                        return None;
                    }
                }
            }
        }
    }

    /// Handle items one at a time until the queue ends. Returns how many
    /// items were handled.
    pub async fn run<F, Fut>(mut self, mut handle: F) -> usize
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut handled = 0;
        while let Some(item) = self.next().await {
            handle(item).await;
            handled += 1;
        }
        handled
    }
}
