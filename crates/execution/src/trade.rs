//! Trade execution port.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

/// Context passed to the executor alongside a buy.
#[derive(Debug, Clone, Default)]
pub struct TradeContext {
    /// Where the trade originated (e.g. "tribute-request").
    pub origin: String,
    /// Requester the trade is attributed to, when known.
    pub requester: Option<Pubkey>,
}

/// External trade executor.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Executes a buy of `mint` and returns the trade signature.
    ///
    /// `skip_safety` tells the executor that its own screening is redundant
    /// because the caller already ran one. `stake_override` replaces the
    /// executor's default stake, in SOL.
    async fn execute_buy(
        &self,
        mint: &Pubkey,
        context: &TradeContext,
        skip_safety: bool,
        stake_override: Option<Decimal>,
    ) -> Result<Signature>;
}
