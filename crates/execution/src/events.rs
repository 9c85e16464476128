//! Pipeline events externalized for telemetry and UI collaborators.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tokio::sync::broadcast;

use crate::request::TradeRequest;

/// Outcome-specific event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEventData {
    /// The watcher accepted a request.
    RequestReceived,
    /// The processor rejected a request.
    RequestRejected {
        /// Risks the analyzer reported, or the generic failure reason.
        risks: Vec<String>,
    },
    /// The processor executed a request.
    RequestAccepted {
        /// Signature of the executed trade.
        execution_signature: Signature,
    },
}

/// One pipeline event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Event ID.
    pub id: String,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
    /// Wallet that paid the tribute.
    pub requester: Pubkey,
    /// Mint the request concerns.
    pub target_mint: Pubkey,
    /// Tribute paid, in UI units.
    pub tribute_amount: Decimal,
    /// Human-readable account of why this event happened.
    pub reasoning: String,
    /// Raw log lines of the originating transaction.
    pub logs: Vec<String>,
    /// Outcome-specific payload.
    pub data: PipelineEventData,
}

impl PipelineEvent {
    fn new(request: &TradeRequest, reasoning: String, data: PipelineEventData) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            requester: request.requester,
            target_mint: request.target_mint,
            tribute_amount: request.tribute_amount,
            reasoning,
            logs: request.logs.clone(),
            data,
        }
    }

    /// Event for a request the watcher accepted.
    pub fn received(request: &TradeRequest, reasoning: impl Into<String>) -> Self {
        Self::new(request, reasoning.into(), PipelineEventData::RequestReceived)
    }

    /// Event for a request the processor rejected.
    pub fn rejected(request: &TradeRequest, reasoning: impl Into<String>, risks: Vec<String>) -> Self {
        Self::new(
            request,
            reasoning.into(),
            PipelineEventData::RequestRejected { risks },
        )
    }

    /// Event for a request the processor executed.
    pub fn accepted(
        request: &TradeRequest,
        reasoning: impl Into<String>,
        execution_signature: Signature,
    ) -> Self {
        Self::new(
            request,
            reasoning.into(),
            PipelineEventData::RequestAccepted {
                execution_signature,
            },
        )
    }
}

/// Broadcast bus for pipeline events.
///
/// Emission never blocks and never fails: events for which no subscriber
/// is listening are simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Creates a bus retaining up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to all events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Emits an event to all current subscribers.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
