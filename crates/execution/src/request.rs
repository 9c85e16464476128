//! Trade request model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tribute_domain::RequestDecision;

/// A validated trade request distilled from one tribute payment.
///
/// Created by the watcher, consumed exactly once by the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Wallet that paid the tribute.
    pub requester: Pubkey,
    /// Mint the request asks the bot to buy.
    pub target_mint: Pubkey,
    /// Tribute paid, in UI units of the tribute mint.
    pub tribute_amount: Decimal,
    /// Signature of the tribute transaction.
    pub source_signature: Signature,
    /// When the watcher accepted the request.
    pub observed_at: DateTime<Utc>,
    /// Raw log lines of the tribute transaction.
    pub logs: Vec<String>,
}

/// Terminal result of one processing pass over a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    /// The request that was processed.
    pub request: TradeRequest,
    /// Terminal decision.
    pub decision: RequestDecision,
    /// Risks reported by the analyzer, or the generic timeout/failure reason.
    pub risk_reasons: Vec<String>,
    /// Signature of the executed trade for accepted requests.
    pub execution_signature: Option<Signature>,
}
