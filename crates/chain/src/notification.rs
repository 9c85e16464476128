use solana_sdk::signature::Signature;

/// A raw log notification for the monitored account.
///
/// Consumed immediately by the watcher; never persisted.
#[derive(Debug, Clone)]
pub struct LogNotification {
    /// Transaction signature the logs belong to.
    pub signature: Signature,
    /// Whether the transaction succeeded on-chain.
    pub succeeded: bool,
    /// Raw log lines as delivered by the node.
    pub logs: Vec<String>,
}
