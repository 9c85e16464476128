//! Test doubles shared across the crate's test modules.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tokio::sync::mpsc;
use tribute_chain::error::ChainError;
use tribute_chain::notification::LogNotification;
use tribute_chain::parse;
use tribute_chain::subscribe::LogSubscription;
use tribute_chain::transaction::{InstructionRecord, TokenBalanceRecord, TransactionRecord};
use tribute_chain::{EventSource, TransactionFetcher};
use tribute_domain::RiskAssessment;

use crate::request::TradeRequest;
use crate::risk::RiskAnalyzer;
use crate::trade::{TradeContext, TradeExecutor};

/// A minimal request for queue/processor tests.
pub(crate) fn request_for(mint: Pubkey) -> TradeRequest {
    TradeRequest {
        requester: Pubkey::new_unique(),
        target_mint: mint,
        tribute_amount: Decimal::from(1500),
        source_signature: Signature::new_unique(),
        observed_at: Utc::now(),
        logs: vec!["Program log: test".to_string()],
    }
}

/// Log lines carrying both request markers.
pub(crate) fn tribute_logs() -> Vec<String> {
    vec![
        format!("Program {} invoke [1]", parse::MEMO_PROGRAM_ID),
        format!("Program {} invoke [1]", spl_token::id()),
    ]
}

/// A confirmed tribute payment: `requester` sends `paid` tribute tokens to
/// the treasury with a memo naming `target_mint`.
pub(crate) fn tribute_record(
    signature: Signature,
    treasury: Pubkey,
    tribute_mint: Pubkey,
    requester: Pubkey,
    paid: Decimal,
    target_mint: Pubkey,
) -> TransactionRecord {
    let initial = Decimal::from(10_000);
    TransactionRecord {
        signature,
        succeeded: true,
        error: None,
        fee_lamports: 5_000,
        account_keys: vec![requester, treasury],
        pre_balances: vec![1_000_000_000, 0],
        post_balances: vec![999_995_000, 0],
        pre_token_balances: vec![
            TokenBalanceRecord {
                owner: Some(requester),
                mint: tribute_mint,
                ui_amount: initial,
            },
            TokenBalanceRecord {
                owner: Some(treasury),
                mint: tribute_mint,
                ui_amount: Decimal::ZERO,
            },
        ],
        post_token_balances: vec![
            TokenBalanceRecord {
                owner: Some(requester),
                mint: tribute_mint,
                ui_amount: initial - paid,
            },
            TokenBalanceRecord {
                owner: Some(treasury),
                mint: tribute_mint,
                ui_amount: paid,
            },
        ],
        instructions: vec![InstructionRecord {
            program: Some("spl-memo".to_string()),
            parsed_text: Some(format!("buy {target_mint}")),
            ..Default::default()
        }],
        log_messages: tribute_logs(),
    }
}

/// Fetcher backed by a signature-to-record map.
pub(crate) struct StaticFetcher {
    records: Mutex<HashMap<Signature, TransactionRecord>>,
}

impl StaticFetcher {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn with_record(record: TransactionRecord) -> Self {
        let fetcher = Self::new();
        fetcher.put(record);
        fetcher
    }

    pub(crate) fn put(&self, record: TransactionRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.signature, record);
    }
}

#[async_trait]
impl TransactionFetcher for StaticFetcher {
    async fn fetch(&self, signature: &Signature) -> Result<Option<TransactionRecord>, ChainError> {
        Ok(self.records.lock().unwrap().get(signature).cloned())
    }
}

/// Event source handing out a pre-built notification channel.
pub(crate) struct ChannelEventSource {
    receiver: Mutex<Option<mpsc::Receiver<LogNotification>>>,
}

impl ChannelEventSource {
    pub(crate) fn new(receiver: mpsc::Receiver<LogNotification>) -> Self {
        Self {
            receiver: Mutex::new(Some(receiver)),
        }
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn subscribe(
        &self,
        _address: &Pubkey,
        _commitment: CommitmentConfig,
    ) -> Result<LogSubscription, ChainError> {
        let receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ChainError::Subscribe("already subscribed".to_string()))?;
        Ok(LogSubscription::from_channel(receiver))
    }
}

/// Analyzer scripted per mint: hang, fail, flag, or pass.
#[derive(Default)]
pub(crate) struct ScriptedAnalyzer {
    pub(crate) hanging: Vec<Pubkey>,
    pub(crate) failing: Vec<Pubkey>,
    pub(crate) flagged: Vec<(Pubkey, Vec<String>)>,
}

#[async_trait]
impl RiskAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, mint: &Pubkey) -> Result<RiskAssessment> {
        if self.hanging.contains(mint) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(mint) {
            anyhow::bail!("analyzer offline");
        }
        if let Some((_, risks)) = self.flagged.iter().find(|(m, _)| m == mint) {
            return Ok(RiskAssessment::unsafe_with(risks.clone()));
        }
        Ok(RiskAssessment::safe())
    }
}

/// Executor recording every call; optionally slow or failing.
#[derive(Default)]
pub(crate) struct RecordingExecutor {
    pub(crate) calls: Mutex<Vec<(Pubkey, bool, Option<Decimal>)>>,
    pub(crate) fail: bool,
    pub(crate) delay: Option<Duration>,
    pub(crate) active: AtomicUsize,
    pub(crate) max_active: AtomicUsize,
}

#[async_trait]
impl TradeExecutor for RecordingExecutor {
    async fn execute_buy(
        &self,
        mint: &Pubkey,
        _context: &TradeContext,
        skip_safety: bool,
        stake_override: Option<Decimal>,
    ) -> Result<Signature> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((*mint, skip_safety, stake_override));
        if self.fail {
            anyhow::bail!("swap failed");
        }
        Ok(Signature::new_unique())
    }
}
