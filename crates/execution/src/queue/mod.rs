//! Bounded, deduplicated admission queue for trade requests.
//!
//! The queue is the one structure touched from both sides of the pipeline:
//! the watcher enqueues, the processor dequeues. A single mutex guards its
//! state; a [`tokio::sync::Notify`] wakes the processor after every
//! successful enqueue.

use std::collections::VecDeque;
use std::time::Instant;

use solana_sdk::pubkey::Pubkey;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::request::TradeRequest;

/// Configuration for the admission queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of waiting requests.
    pub capacity: usize,
    /// Soft cap on the recently-processed mint set.
    pub recent_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            recent_capacity: 64,
        }
    }
}

/// Outcome of an enqueue attempt.
#[derive(Debug)]
pub enum EnqueueOutcome {
    /// The request was queued; carries the entry evicted to make room, if
    /// the queue was full.
    Queued { evicted: Option<TradeRequest> },
    /// A request for the same mint is already waiting.
    AlreadyQueued,
    /// A request for the same mint was processed moments ago.
    RecentlyProcessed,
}

struct QueueEntry {
    request: TradeRequest,
    enqueued_at: Instant,
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<QueueEntry>,
    recent: VecDeque<Pubkey>,
}

impl QueueState {
    fn remember(&mut self, mint: Pubkey, soft_cap: usize) {
        self.recent.push_back(mint);
        // Over the soft cap, keep only the newest half.
        if self.recent.len() > soft_cap {
            let drop = self.recent.len() / 2;
            self.recent.drain(..drop);
        }
    }
}

/// FIFO holding area with content-key dedup and drop-oldest overflow.
pub struct RequestQueue {
    config: QueueConfig,
    state: Mutex<QueueState>,
    ready: Notify,
}

impl RequestQueue {
    /// Creates an empty queue.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            state: Mutex::new(QueueState::default()),
            ready: Notify::new(),
        }
    }

    /// Admits a request unless its mint is already queued or was processed
    /// recently. At capacity the single oldest entry is evicted first:
    /// freshness wins over fairness to earlier submitters.
    pub async fn enqueue(&self, request: TradeRequest) -> EnqueueOutcome {
        let mut state = self.state.lock().await;

        if state
            .entries
            .iter()
            .any(|entry| entry.request.target_mint == request.target_mint)
        {
            return EnqueueOutcome::AlreadyQueued;
        }
        if state.recent.contains(&request.target_mint) {
            return EnqueueOutcome::RecentlyProcessed;
        }

        let evicted = if state.entries.len() >= self.config.capacity {
            state.entries.pop_front().map(|entry| entry.request)
        } else {
            None
        };
        state.entries.push_back(QueueEntry {
            request,
            enqueued_at: Instant::now(),
        });
        drop(state);

        self.ready.notify_one();
        EnqueueOutcome::Queued { evicted }
    }

    /// Waits for the next request in FIFO order, marking its mint recent.
    pub async fn dequeue(&self) -> TradeRequest {
        loop {
            let ready = self.ready.notified();
            if let Some(request) = self.try_dequeue().await {
                return request;
            }
            ready.await;
        }
    }

    /// Takes the next request without waiting.
    pub async fn try_dequeue(&self) -> Option<TradeRequest> {
        let mut state = self.state.lock().await;
        let entry = state.entries.pop_front()?;
        state.remember(entry.request.target_mint, self.config.recent_capacity);
        debug!(
            mint = %entry.request.target_mint,
            waited_ms = entry.enqueued_at.elapsed().as_millis(),
            "Dequeued request"
        );
        Some(entry.request)
    }

    /// Number of waiting requests.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Whether the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::request_for;

    fn queue(capacity: usize) -> RequestQueue {
        RequestQueue::new(QueueConfig {
            capacity,
            recent_capacity: 8,
        })
    }

    #[tokio::test]
    async fn duplicate_mint_is_rejected_while_queued() {
        let queue = queue(4);
        let mint = Pubkey::new_unique();

        assert!(matches!(
            queue.enqueue(request_for(mint)).await,
            EnqueueOutcome::Queued { evicted: None }
        ));
        assert!(matches!(
            queue.enqueue(request_for(mint)).await,
            EnqueueOutcome::AlreadyQueued
        ));
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn overflow_evicts_exactly_the_oldest_entry() {
        let queue = queue(3);
        let oldest = Pubkey::new_unique();
        queue.enqueue(request_for(oldest)).await;
        queue.enqueue(request_for(Pubkey::new_unique())).await;
        queue.enqueue(request_for(Pubkey::new_unique())).await;

        let outcome = queue.enqueue(request_for(Pubkey::new_unique())).await;
        match outcome {
            EnqueueOutcome::Queued { evicted: Some(evicted) } => {
                assert_eq!(evicted.target_mint, oldest);
            }
            other => panic!("expected eviction, got {other:?}"),
        }
        assert_eq!(queue.len().await, 3);
    }

    #[tokio::test]
    async fn recently_processed_mint_is_rejected() {
        let queue = queue(4);
        let mint = Pubkey::new_unique();
        queue.enqueue(request_for(mint)).await;
        queue.try_dequeue().await.unwrap();

        assert!(matches!(
            queue.enqueue(request_for(mint)).await,
            EnqueueOutcome::RecentlyProcessed
        ));
    }

    #[tokio::test]
    async fn dequeue_preserves_fifo_order() {
        let queue = queue(4);
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();
        queue.enqueue(request_for(first)).await;
        queue.enqueue(request_for(second)).await;

        assert_eq!(queue.dequeue().await.target_mint, first);
        assert_eq!(queue.dequeue().await.target_mint, second);
    }

    #[tokio::test]
    async fn dequeue_wakes_on_enqueue() {
        let queue = std::sync::Arc::new(queue(4));
        let mint = Pubkey::new_unique();

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::task::yield_now().await;
        queue.enqueue(request_for(mint)).await;

        assert_eq!(waiter.await.unwrap().target_mint, mint);
    }

    #[tokio::test]
    async fn recent_set_trims_to_newest_half() {
        let queue = RequestQueue::new(QueueConfig {
            capacity: 16,
            recent_capacity: 4,
        });
        let first = Pubkey::new_unique();
        let mut mints = vec![first];
        mints.extend((0..4).map(|_| Pubkey::new_unique()));
        for mint in &mints {
            queue.enqueue(request_for(*mint)).await;
            queue.try_dequeue().await.unwrap();
        }

        // The trim dropped the oldest half, so the first mint is admissible
        // again while the most recent one is still blocked.
        assert!(matches!(
            queue.enqueue(request_for(first)).await,
            EnqueueOutcome::Queued { .. }
        ));
        assert!(matches!(
            queue.enqueue(request_for(*mints.last().unwrap())).await,
            EnqueueOutcome::RecentlyProcessed
        ));
    }
}
