//! WebSocket log subscription for the monitored account.
//!
//! Network I/O is kept behind a channel so the validation pipeline can be
//! driven by synthetic notifications in tests.

use async_trait::async_trait;
use futures_util::StreamExt;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::EventSource;
use crate::error::ChainError;
use crate::notification::LogNotification;

/// A live log subscription: a stream of notifications plus the handle that
/// tears the underlying connection down.
pub struct LogSubscription {
    notifications: mpsc::Receiver<LogNotification>,
    worker: Option<JoinHandle<()>>,
}

impl LogSubscription {
    /// Wraps a bare channel; used by in-memory event sources.
    pub fn from_channel(notifications: mpsc::Receiver<LogNotification>) -> Self {
        Self {
            notifications,
            worker: None,
        }
    }

    /// Wraps a channel fed by a background worker task.
    pub fn with_worker(
        notifications: mpsc::Receiver<LogNotification>,
        worker: JoinHandle<()>,
    ) -> Self {
        Self {
            notifications,
            worker: Some(worker),
        }
    }

    /// Receives the next notification; `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<LogNotification> {
        self.notifications.recv().await
    }

    /// Cancels the subscription. In-flight consumers of already-delivered
    /// notifications are unaffected.
    pub fn shutdown(mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

/// Configuration for the pubsub event source.
#[derive(Debug, Clone)]
pub struct PubsubConfig {
    /// WebSocket URL.
    pub ws_url: String,
    /// Capacity of the notification channel.
    pub channel_capacity: usize,
}

impl Default for PubsubConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://api.mainnet-beta.solana.com".to_string(),
            channel_capacity: 1024,
        }
    }
}

/// Log event source over the Solana pubsub WebSocket API.
pub struct PubsubEventSource {
    config: PubsubConfig,
}

impl PubsubEventSource {
    pub fn new(config: PubsubConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EventSource for PubsubEventSource {
    async fn subscribe(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<LogSubscription, ChainError> {
        let client = PubsubClient::new(&self.config.ws_url)
            .await
            .map_err(|err| ChainError::Subscribe(err.to_string()))?;

        let filter = RpcTransactionLogsFilter::Mentions(vec![address.to_string()]);
        let config = RpcTransactionLogsConfig {
            commitment: Some(commitment),
        };
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let address = *address;

        let worker = tokio::spawn(async move {
            let (mut stream, unsubscribe) = match client.logs_subscribe(filter, config).await {
                Ok(subscription) => subscription,
                Err(err) => {
                    error!(address = %address, error = %err, "Log subscription failed");
                    return;
                }
            };

            info!(address = %address, "Subscribed to account logs");

            while let Some(response) = stream.next().await {
                let value = response.value;
                let Ok(signature) = value.signature.parse::<Signature>() else {
                    debug!(signature = %value.signature, "Dropping notification with bad signature");
                    continue;
                };
                let notification = LogNotification {
                    signature,
                    succeeded: value.err.is_none(),
                    logs: value.logs,
                };
                if tx.send(notification).await.is_err() {
                    break;
                }
            }

            unsubscribe().await;
            debug!(address = %address, "Log subscription closed");
        });

        Ok(LogSubscription::with_worker(rx, worker))
    }
}
