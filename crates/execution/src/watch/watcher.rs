//! Watches the treasury wallet and turns tribute payments into requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rust_decimal::Decimal;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};
use tribute_chain::error::ChainError;
use tribute_chain::notification::LogNotification;
use tribute_chain::transaction::TransactionRecord;
use tribute_chain::{EventSource, TransactionFetcher, parse};

use super::dedup::{CooldownMap, SignatureWindow};
use crate::events::{EventBus, PipelineEvent};
use crate::queue::{EnqueueOutcome, RequestQueue};
use crate::request::TradeRequest;

/// Configuration for the tribute watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Treasury wallet to watch.
    pub treasury: Pubkey,
    /// Mint tribute must be paid in.
    pub tribute_mint: Pubkey,
    /// Minimum tribute, in UI units of the tribute mint.
    pub min_tribute: Decimal,
    /// Per-requester cooldown between accepted requests.
    pub cooldown: Duration,
    /// Commitment level for the log subscription.
    pub commitment: CommitmentConfig,
    /// Soft capacity of the signature dedup window.
    pub signature_window: usize,
}

impl WatcherConfig {
    /// Production defaults for a treasury/tribute-mint pair.
    pub fn new(treasury: Pubkey, tribute_mint: Pubkey) -> Self {
        Self {
            treasury,
            tribute_mint,
            min_tribute: Decimal::from(1_000),
            cooldown: Duration::from_secs(60),
            commitment: CommitmentConfig::confirmed(),
            signature_window: 1_000,
        }
    }
}

/// Watches one treasury wallet for tribute payments and feeds the queue.
pub struct TributeWatcher<S, F> {
    source: Arc<S>,
    context: Arc<WatchContext<F>>,
    shutdown: Notify,
}

/// Shared state of the per-notification pipeline. One handler task is
/// spawned per notification; only the dedup check is serialized.
struct WatchContext<F> {
    config: WatcherConfig,
    fetcher: Arc<F>,
    queue: Arc<RequestQueue>,
    events: EventBus,
    seen: Mutex<SignatureWindow>,
    cooldowns: Mutex<CooldownMap>,
}

impl<S, F> TributeWatcher<S, F>
where
    S: EventSource,
    F: TransactionFetcher + 'static,
{
    /// Creates a watcher feeding `queue`.
    pub fn new(
        config: WatcherConfig,
        source: Arc<S>,
        fetcher: Arc<F>,
        queue: Arc<RequestQueue>,
        events: EventBus,
    ) -> Self {
        let seen = Mutex::new(SignatureWindow::new(config.signature_window));
        let cooldowns = Mutex::new(CooldownMap::new(config.cooldown));
        Self {
            source,
            context: Arc::new(WatchContext {
                config,
                fetcher,
                queue,
                events,
                seen,
                cooldowns,
            }),
            shutdown: Notify::new(),
        }
    }

    /// Subscribes and dispatches notifications until stopped.
    ///
    /// Each notification is handled on its own task, so a slow transaction
    /// fetch never delays the next notification. Stopping cancels the
    /// subscription only; handlers already running finish on their own.
    pub async fn run(&self) -> Result<(), ChainError> {
        let mut subscription = self
            .source
            .subscribe(&self.context.config.treasury, self.context.config.commitment)
            .await?;

        info!(
            treasury = %self.context.config.treasury,
            tribute_mint = %self.context.config.tribute_mint,
            min_tribute = %self.context.config.min_tribute,
            "Tribute watcher started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                notification = subscription.recv() => match notification {
                    Some(notification) => {
                        let context = Arc::clone(&self.context);
                        tokio::spawn(async move { context.handle(notification).await });
                    }
                    None => {
                        warn!("Log notification stream ended");
                        break;
                    }
                },
            }
        }

        subscription.shutdown();
        info!("Tribute watcher stopped");
        Ok(())
    }

    /// Stops the run loop and cancels the subscription.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }
}

impl<F: TransactionFetcher> WatchContext<F> {
    async fn handle(&self, notification: LogNotification) {
        let signature = notification.signature;

        if !notification.succeeded {
            debug!(signature = %signature, "Skipping failed transaction");
            return;
        }
        if !self.seen.lock().await.insert(signature) {
            debug!(signature = %signature, "Skipping redelivered signature");
            return;
        }
        if !parse::has_request_markers(&notification.logs) {
            debug!(signature = %signature, "Logs lack memo or token markers");
            return;
        }

        let record = match self.fetcher.fetch(&signature).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(signature = %signature, "Transaction not found");
                return;
            }
            Err(err) => {
                warn!(signature = %signature, error = %err, "Transaction fetch failed");
                return;
            }
        };

        let Some(memo) = parse::first_memo_text(&record) else {
            debug!(signature = %signature, "No recoverable memo text");
            return;
        };
        let Some(target_mint) = parse::extract_target_mint(&memo) else {
            debug!(signature = %signature, memo = %memo, "Memo names no valid mint");
            return;
        };
        let Some((requester, tribute_amount)) = self.attribute_tribute(&record) else {
            debug!(signature = %signature, "No attributable tribute payer");
            return;
        };
        if tribute_amount < self.config.min_tribute {
            debug!(
                requester = %requester,
                tribute = %tribute_amount,
                min = %self.config.min_tribute,
                "Tribute below minimum"
            );
            return;
        }
        if !self
            .cooldowns
            .lock()
            .await
            .check_and_record(requester, Instant::now())
        {
            debug!(requester = %requester, "Requester still in cooldown");
            return;
        }

        let request = TradeRequest {
            requester,
            target_mint,
            tribute_amount,
            source_signature: signature,
            observed_at: Utc::now(),
            logs: notification.logs,
        };

        info!(
            requester = %requester,
            mint = %target_mint,
            tribute = %tribute_amount,
            "Accepted trade request"
        );
        let reasoning =
            format!("{requester} paid {tribute_amount} tribute to request {target_mint}");
        self.events.emit(PipelineEvent::received(&request, reasoning));

        match self.queue.enqueue(request).await {
            EnqueueOutcome::Queued { evicted: Some(evicted) } => {
                warn!(mint = %evicted.target_mint, "Evicted oldest queued request");
            }
            EnqueueOutcome::Queued { evicted: None } => {}
            EnqueueOutcome::AlreadyQueued => {
                debug!(mint = %target_mint, "Mint already queued");
            }
            EnqueueOutcome::RecentlyProcessed => {
                debug!(mint = %target_mint, "Mint processed recently");
            }
        }
    }

    /// The tribute payer is the non-treasury owner whose tribute-mint
    /// balance decreased; the decrease is the tribute.
    fn attribute_tribute(&self, record: &TransactionRecord) -> Option<(Pubkey, Decimal)> {
        for owner in record.token_owners(&self.config.tribute_mint) {
            if owner == self.config.treasury {
                continue;
            }
            if let Some(delta) = record.token_delta(&owner, &self.config.tribute_mint) {
                if delta < Decimal::ZERO {
                    return Some((owner, delta.abs()));
                }
            }
        }
        None
    }
}
