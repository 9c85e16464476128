use thiserror::Error;

/// Errors at the chain boundary.
#[derive(Debug, Error)]
pub enum ChainError {
    /// WebSocket subscription could not be established.
    #[error("log subscription failed: {0}")]
    Subscribe(String),
    /// RPC request failed in transport.
    #[error("rpc request failed: {0}")]
    Rpc(String),
    /// The RPC payload could not be mapped into a transaction record.
    #[error("malformed transaction payload: {0}")]
    Malformed(String),
}
