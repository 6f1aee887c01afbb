// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deduplicating work queue with rate-limited requeue on failure.

pub mod rate_limiter;

pub use rate_limiter::RateLimiter;

use crate::types::ObjectKey;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::debug;

/// Deduplicating FIFO of deployment keys. A key added multiple times before
/// dispatch is handed out once; a key re-added while a worker holds it is
/// dispatched exactly once more after `done`. Failed items come back through
/// `add_rate_limited` with an exponential per-key delay.
pub struct WorkQueue {
    state: Mutex<State>,
    limiter: Mutex<RateLimiter>,
    notify: Notify,
}

#[derive(Default)]
struct State {
    queue: VecDeque<ObjectKey>,
    /// Keys awaiting dispatch, or marked for re-dispatch after `done`
    pending: HashSet<ObjectKey>,
    /// Keys currently held by a worker
    in_flight: HashSet<ObjectKey>,
    shutting_down: bool,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            limiter: Mutex::new(RateLimiter::new()),
            notify: Notify::new(),
        }
    }

    /// Queue a key for processing. No-op if the key is already waiting; if
    /// the key is in-flight it is remembered and re-queued on `done`.
    pub fn add(&self, key: ObjectKey) {
        let mut state = self.state.lock().unwrap();
        if state.shutting_down {
            return;
        }
        if !state.pending.insert(key.clone()) {
            return;
        }
        if state.in_flight.contains(&key) {
            // re-queued by done()
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.notify.notify_one();
    }

    /// Wait for the next key. Returns `None` once the queue is shut down;
    /// the returned key is marked in-flight and will not be handed to
    /// another worker until `done` is called for it.
    pub async fn get(&self) -> Option<ObjectKey> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().unwrap();
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.pending.remove(&key);
                    state.in_flight.insert(key.clone());
                    return Some(key);
                }
            }
            notified.await;
        }
    }

    /// Mark a dispatched key as finished. If the key was re-added while the
    /// worker held it, it becomes dispatchable again.
    pub fn done(&self, key: &ObjectKey) {
        let mut state = self.state.lock().unwrap();
        state.in_flight.remove(key);
        if state.pending.contains(key) && !state.shutting_down {
            state.queue.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Re-queue a failed key after its per-key backoff delay
    pub fn add_rate_limited(self: &Arc<Self>, key: ObjectKey) {
        let delay = self.limiter.lock().unwrap().next_delay(&key);
        debug!("requeueing {} in {:?}", key, delay);

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    /// Clear the backoff history for a key after a terminal outcome
    pub fn forget(&self, key: &ObjectKey) {
        self.limiter.lock().unwrap().forget(key);
    }

    /// Number of consecutive failures recorded for a key
    pub fn retries(&self, key: &ObjectKey) -> u32 {
        self.limiter.lock().unwrap().retries(key)
    }

    /// Stop the queue: `get` fails fast from here on, pending keys are
    /// dropped, and workers finish whatever they currently hold.
    pub fn shut_down(&self) {
        self.state.lock().unwrap().shutting_down = true;
        self.notify.notify_waiters();
    }

    /// Number of keys waiting for dispatch
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("default", name)
    }

    #[tokio::test]
    async fn test_add_deduplicates_waiting_keys() {
        let queue = WorkQueue::new();

        queue.add(key("web"));
        queue.add(key("web"));
        queue.add(key("web"));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await, Some(key("web")));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_keys_are_dispatched_in_order() {
        let queue = WorkQueue::new();

        queue.add(key("web"));
        queue.add(key("api"));

        assert_eq!(queue.get().await, Some(key("web")));
        assert_eq!(queue.get().await, Some(key("api")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_key_is_not_dispatched_twice() {
        let queue = WorkQueue::new();

        queue.add(key("web"));
        let held = queue.get().await.unwrap();
        queue.add(key("web"));

        // held by a worker, must not be handed out again until done
        assert!(timeout(Duration::from_millis(50), queue.get())
            .await
            .is_err());

        queue.done(&held);
        assert_eq!(queue.get().await, Some(key("web")));
    }

    #[tokio::test]
    async fn test_add_while_in_flight_dispatches_exactly_once_more() {
        let queue = WorkQueue::new();

        queue.add(key("web"));
        let held = queue.get().await.unwrap();
        queue.add(key("web"));
        queue.add(key("web"));
        queue.done(&held);

        assert_eq!(queue.get().await, Some(key("web")));
        queue.done(&key("web"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_get_blocks_until_a_key_arrives() {
        let queue = Arc::new(WorkQueue::new());

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;

        queue.add(key("web"));
        assert_eq!(waiter.await.unwrap(), Some(key("web")));
    }

    #[tokio::test]
    async fn test_shutdown_wakes_blocked_workers() {
        let queue = Arc::new(WorkQueue::new());

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;

        queue.shut_down();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_after_shutdown_is_ignored() {
        let queue = WorkQueue::new();

        queue.shut_down();
        queue.add(key("web"));

        assert!(queue.is_empty());
        assert_eq!(queue.get().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_add_requeues_after_the_delay() {
        let queue = Arc::new(WorkQueue::new());

        queue.add_rate_limited(key("web"));
        assert_eq!(queue.retries(&key("web")), 1);

        assert_eq!(queue.get().await, Some(key("web")));
    }

    #[tokio::test]
    async fn test_forget_resets_the_backoff_counter() {
        let queue = Arc::new(WorkQueue::new());

        queue.add_rate_limited(key("web"));
        queue.add_rate_limited(key("web"));
        assert_eq!(queue.retries(&key("web")), 2);

        queue.forget(&key("web"));
        assert_eq!(queue.retries(&key("web")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_workers_never_hold_the_same_key_concurrently() {
        let queue = Arc::new(WorkQueue::new());
        let active = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicBool::new(false));

        let workers: Vec<_> = (0..2)
            .map(|_| {
                let queue = queue.clone();
                let active = active.clone();
                let overlapped = overlapped.clone();
                tokio::spawn(async move {
                    while let Some(held) = queue.get().await {
                        if active.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlapped.store(true, Ordering::SeqCst);
                        }
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        queue.done(&held);
                    }
                })
            })
            .collect();

        for _ in 0..20 {
            queue.add(key("web"));
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        queue.shut_down();
        for worker in workers {
            worker.await.unwrap();
        }

        assert!(!overlapped.load(Ordering::SeqCst));
    }
}
