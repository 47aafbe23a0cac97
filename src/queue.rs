//! Ordered hand-off queue between the I/O task and the processing task.
//!
//! The parser enqueues, the session engine dequeues. Enqueue never blocks;
//! [`MessageQueue::dequeue`] suspends the caller until an element is
//! available. Listeners observe every enqueued element synchronously.
//!
//! # Example
//!
//! ```
//! use netconf_emu::queue::MessageQueue;
//! use netconf_emu::rpc::{Operation, Query, RpcElement};
//!
//! let queue = MessageQueue::new();
//! queue.enqueue(Query::new("1", Operation::Get).into());
//!
//! let element: Option<RpcElement> = queue.try_dequeue();
//! assert_eq!(element.unwrap().message_id(), Some("1"));
//! assert!(queue.is_empty());
//! ```

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio::sync::Notify;

use crate::rpc::RpcElement;

/// Observer notified on every enqueue.
pub trait QueueListener: Send + Sync {
    fn on_enqueue(&self, element: &RpcElement);
}

impl<F> QueueListener for F
where
    F: Fn(&RpcElement) + Send + Sync,
{
    fn on_enqueue(&self, element: &RpcElement) {
        self(element)
    }
}

/// Unbounded FIFO of RPC elements.
///
/// Safe for one producer and one consumer running concurrently; callers
/// need no extra locking.
#[derive(Default)]
pub struct MessageQueue {
    elements: Mutex<VecDeque<RpcElement>>,
    available: Notify,
    listeners: RwLock<Vec<Arc<dyn QueueListener>>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners run on the enqueueing task.
    pub fn add_listener(&self, listener: Arc<dyn QueueListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Append `element` to the tail and wake a waiting consumer.
    ///
    /// A panicking listener is logged and does not affect the queue.
    pub fn enqueue(&self, element: RpcElement) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener.on_enqueue(&element))).is_err() {
                tracing::warn!("Queue listener panicked on <{}>", element.root_name());
            }
        }

        self.lock().push_back(element);
        self.available.notify_one();
    }

    /// Remove and return the head element, waiting until one exists.
    pub async fn dequeue(&self) -> RpcElement {
        loop {
            let notified = self.available.notified();
            if let Some(element) = self.try_dequeue() {
                return element;
            }
            notified.await;
        }
    }

    /// Remove and return the head element without waiting.
    pub fn try_dequeue(&self) -> Option<RpcElement> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<RpcElement>> {
        self.elements.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::rpc::{Hello, Operation, Query};

    fn query(id: usize) -> RpcElement {
        Query::new(id.to_string(), Operation::Get).into()
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = MessageQueue::new();
        for i in 0..50 {
            queue.enqueue(query(i));
        }

        for i in 0..50 {
            let element = queue.dequeue().await;
            assert_eq!(element.message_id(), Some(i.to_string().as_str()));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_dequeue_on_empty_queue() {
        let queue = MessageQueue::new();
        assert_eq!(queue.try_dequeue(), None);

        queue.enqueue(Hello::server("1").into());
        assert_eq!(queue.len(), 1);
        assert!(queue.try_dequeue().is_some());
        assert_eq!(queue.try_dequeue(), None);
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_producer() {
        let queue = Arc::new(MessageQueue::new());

        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.enqueue(query(1));
        });

        let element = tokio::time::timeout(Duration::from_secs(1), queue.dequeue())
            .await
            .expect("dequeue should complete once an element is enqueued");
        assert_eq!(element.message_id(), Some("1"));
    }

    #[tokio::test]
    async fn test_concurrent_producer_consumer_keeps_order() {
        let queue = Arc::new(MessageQueue::new());

        let producer = queue.clone();
        let handle = tokio::spawn(async move {
            for i in 0..500 {
                producer.enqueue(query(i));
                if i % 50 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        });

        for i in 0..500 {
            let element = queue.dequeue().await;
            assert_eq!(element.message_id(), Some(i.to_string().as_str()));
        }
        handle.await.unwrap();
    }

    #[test]
    fn test_listeners_see_every_enqueue() {
        let queue = MessageQueue::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        queue.add_listener(Arc::new(move |_: &RpcElement| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        queue.enqueue(query(1));
        queue.enqueue(query(2));

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_panicking_listener_does_not_affect_queue() {
        let queue = MessageQueue::new();
        queue.add_listener(Arc::new(|_: &RpcElement| panic!("listener failure")));

        queue.enqueue(query(1));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_dequeue(), Some(query(1)));
    }
}
