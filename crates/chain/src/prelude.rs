//! Prelude module for convenient imports.

pub use crate::error::ChainError;
pub use crate::notification::LogNotification;
pub use crate::parse::{
    MEMO_PROGRAM_ID, MEMO_V1_PROGRAM_ID, extract_target_mint, first_memo_text, has_request_markers,
};
pub use crate::rpc::RpcTransactionFetcher;
pub use crate::subscribe::{LogSubscription, PubsubConfig, PubsubEventSource};
pub use crate::transaction::{InstructionRecord, TokenBalanceRecord, TransactionRecord};
pub use crate::{EventSource, TransactionFetcher};
