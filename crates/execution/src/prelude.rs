//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.

// Events
pub use crate::events::{EventBus, PipelineEvent, PipelineEventData};

// Notifications
pub use crate::notify::{
    LogNotifier, MessageGenerator, MultiNotifier, Notifier, RejectionContext, fallback_rejection,
};

// Processing
pub use crate::process::{
    ANALYSIS_FAILURE_REASON, ANALYSIS_TIMEOUT_REASON, ProcessorConfig, RequestProcessor,
};

// Queue
pub use crate::queue::{EnqueueOutcome, QueueConfig, RequestQueue};

// Reconciliation
pub use crate::reconcile::{
    RealizedTrade, ReconcilerConfig, SettlementOutcome, TradeReconciler,
};

// Requests
pub use crate::request::{ProcessingOutcome, TradeRequest};

// Ports
pub use crate::risk::RiskAnalyzer;
pub use crate::trade::{TradeContext, TradeExecutor};

// Stats
pub use crate::stats::{OutcomeLog, OutcomeStats};

// Watching
pub use crate::watch::{CooldownMap, SignatureWindow, TributeWatcher, WatcherConfig};
