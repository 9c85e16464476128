//! Solana plumbing for the tribute pipeline.
//!
//! This crate owns the boundary between the chain and the business logic:
//! - Log notification and transaction record models
//! - Balance-delta helpers over confirmed transaction state
//! - Memo and target-mint parsers
//! - RPC and pubsub backed implementations of the fetch/subscribe traits

pub mod error;
pub mod notification;
pub mod parse;
pub mod prelude;
pub mod rpc;
pub mod subscribe;
pub mod transaction;

use async_trait::async_trait;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::error::ChainError;
use crate::subscribe::LogSubscription;
use crate::transaction::TransactionRecord;

/// Fetches confirmed transaction detail by signature.
///
/// `Ok(None)` means the transaction is not (yet) known at the requested
/// commitment; transport failures surface as errors.
#[async_trait]
pub trait TransactionFetcher: Send + Sync {
    async fn fetch(&self, signature: &Signature) -> Result<Option<TransactionRecord>, ChainError>;
}

/// Push source of log notifications for one account.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn subscribe(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<LogSubscription, ChainError>;
}
