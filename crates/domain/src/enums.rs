use serde::{Deserialize, Serialize};

/// Direction of a trade relative to the target asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    /// Gaining the target asset, spending SOL.
    Buy,
    /// Giving up the target asset, receiving SOL.
    Sell,
}

/// Terminal decision for a processed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestDecision {
    /// Passed the risk check and the trade went through.
    Accepted,
    /// Failed the risk check, or the analysis itself errored.
    Rejected,
    /// The risk analysis did not finish within the deadline.
    TimedOut,
    /// Passed the risk check but the trade execution failed.
    ExecutionFailed,
}

impl RequestDecision {
    /// Whether the request cleared the risk check, regardless of how
    /// execution went.
    pub fn passed_risk_check(&self) -> bool {
        matches!(self, Self::Accepted | Self::ExecutionFailed)
    }
}
