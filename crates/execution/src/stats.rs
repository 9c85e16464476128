//! Bounded history and aggregate counters for processed requests.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;
use tribute_domain::RequestDecision;

use crate::request::ProcessingOutcome;

/// Aggregate counters across all processed requests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutcomeStats {
    /// Requests that were executed.
    pub accepted: u64,
    /// Requests rejected by the risk check or an analysis failure.
    pub rejected: u64,
    /// Requests whose analysis hit the deadline.
    pub timed_out: u64,
    /// Requests that passed the risk check but failed to execute.
    pub execution_failed: u64,
    /// Total tribute across all processed requests, in UI units.
    pub total_tribute: Decimal,
}

impl OutcomeStats {
    /// Total number of processed requests.
    pub fn processed(&self) -> u64 {
        self.accepted + self.rejected + self.timed_out + self.execution_failed
    }
}

#[derive(Default)]
struct OutcomeLogState {
    stats: OutcomeStats,
    history: VecDeque<ProcessingOutcome>,
}

/// Keeps the last `history_cap` outcomes plus running counters.
pub struct OutcomeLog {
    history_cap: usize,
    inner: RwLock<OutcomeLogState>,
}

impl OutcomeLog {
    /// Creates a log retaining up to `history_cap` outcomes.
    pub fn new(history_cap: usize) -> Self {
        Self {
            history_cap,
            inner: RwLock::new(OutcomeLogState::default()),
        }
    }

    /// Records one processed outcome.
    pub async fn record(&self, outcome: &ProcessingOutcome) {
        let mut inner = self.inner.write().await;
        match outcome.decision {
            RequestDecision::Accepted => inner.stats.accepted += 1,
            RequestDecision::Rejected => inner.stats.rejected += 1,
            RequestDecision::TimedOut => inner.stats.timed_out += 1,
            RequestDecision::ExecutionFailed => inner.stats.execution_failed += 1,
        }
        inner.stats.total_tribute += outcome.request.tribute_amount;
        inner.history.push_back(outcome.clone());
        if inner.history.len() > self.history_cap {
            inner.history.pop_front();
        }
    }

    /// Snapshot of the aggregate counters.
    pub async fn stats(&self) -> OutcomeStats {
        self.inner.read().await.stats.clone()
    }

    /// The most recent outcomes, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<ProcessingOutcome> {
        self.inner
            .read()
            .await
            .history
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}

impl Default for OutcomeLog {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::request_for;
    use rust_decimal_macros::dec;
    use solana_sdk::pubkey::Pubkey;

    fn outcome(decision: RequestDecision) -> ProcessingOutcome {
        ProcessingOutcome {
            request: request_for(Pubkey::new_unique()),
            decision,
            risk_reasons: Vec::new(),
            execution_signature: None,
        }
    }

    #[tokio::test]
    async fn counters_track_each_decision() {
        let log = OutcomeLog::default();
        log.record(&outcome(RequestDecision::Accepted)).await;
        log.record(&outcome(RequestDecision::Rejected)).await;
        log.record(&outcome(RequestDecision::TimedOut)).await;
        log.record(&outcome(RequestDecision::ExecutionFailed)).await;

        let stats = log.stats().await;
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.execution_failed, 1);
        assert_eq!(stats.processed(), 4);
        assert_eq!(stats.total_tribute, dec!(6000));
    }

    #[tokio::test]
    async fn history_is_bounded_and_newest_first() {
        let log = OutcomeLog::new(2);
        for _ in 0..3 {
            log.record(&outcome(RequestDecision::Accepted)).await;
        }

        let recent = log.recent(10).await;
        assert_eq!(recent.len(), 2);
        let stats = log.stats().await;
        assert_eq!(stats.accepted, 3);
    }
}
