//! RPC-backed transaction fetcher.
//!
//! Maps `getTransaction` responses (jsonParsed encoding) into the flat
//! [`TransactionRecord`] model so the rest of the pipeline never touches
//! RPC response types.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiInstruction, UiMessage,
    UiParsedInstruction, UiTransactionEncoding, UiTransactionTokenBalance,
};

use crate::TransactionFetcher;
use crate::error::ChainError;
use crate::transaction::{InstructionRecord, TokenBalanceRecord, TransactionRecord};

/// Transaction fetcher over a nonblocking RPC client.
pub struct RpcTransactionFetcher {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcTransactionFetcher {
    /// Creates a fetcher with its own RPC client.
    pub fn new(rpc_url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        let client = Arc::new(RpcClient::new_with_commitment(rpc_url.into(), commitment));
        Self { client, commitment }
    }

    /// Creates a fetcher sharing an existing RPC client.
    pub fn with_client(client: Arc<RpcClient>, commitment: CommitmentConfig) -> Self {
        Self { client, commitment }
    }
}

#[async_trait]
impl TransactionFetcher for RpcTransactionFetcher {
    async fn fetch(&self, signature: &Signature) -> Result<Option<TransactionRecord>, ChainError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };

        match self
            .client
            .get_transaction_with_config(signature, config)
            .await
        {
            Ok(response) => Ok(Some(convert_transaction(*signature, response)?)),
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(ChainError::Rpc(err.to_string())),
        }
    }
}

/// The RPC client surfaces an absent transaction as an error rather than a
/// null payload; detect both spellings so callers see `Ok(None)`.
fn is_not_found(err: &ClientError) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("not found") || message.contains("invalid type: null")
}

fn convert_transaction(
    signature: Signature,
    response: EncodedConfirmedTransactionWithStatusMeta,
) -> Result<TransactionRecord, ChainError> {
    let meta = response
        .transaction
        .meta
        .ok_or_else(|| ChainError::Malformed("transaction meta missing".to_string()))?;

    let (account_keys, instructions) = match response.transaction.transaction {
        EncodedTransaction::Json(transaction) => match transaction.message {
            UiMessage::Parsed(message) => {
                let keys: Vec<Pubkey> = message
                    .account_keys
                    .iter()
                    .map(|account| Pubkey::from_str(&account.pubkey).unwrap_or_default())
                    .collect();
                let instructions = message
                    .instructions
                    .iter()
                    .map(|ix| convert_instruction(ix, &keys))
                    .collect();
                (keys, instructions)
            }
            UiMessage::Raw(message) => {
                let keys: Vec<Pubkey> = message
                    .account_keys
                    .iter()
                    .map(|key| Pubkey::from_str(key).unwrap_or_default())
                    .collect();
                let instructions = message
                    .instructions
                    .iter()
                    .map(|ix| UiInstruction::Compiled(ix.clone()))
                    .map(|ix| convert_instruction(&ix, &keys))
                    .collect();
                (keys, instructions)
            }
        },
        _ => {
            return Err(ChainError::Malformed(
                "unexpected transaction encoding".to_string(),
            ));
        }
    };

    Ok(TransactionRecord {
        signature,
        succeeded: meta.err.is_none(),
        error: meta.err.as_ref().map(|err| err.to_string()),
        fee_lamports: meta.fee,
        account_keys,
        pre_balances: meta.pre_balances,
        post_balances: meta.post_balances,
        pre_token_balances: convert_token_balances(meta.pre_token_balances),
        post_token_balances: convert_token_balances(meta.post_token_balances),
        instructions,
        log_messages: Option::<Vec<String>>::from(meta.log_messages).unwrap_or_default(),
    })
}

fn convert_instruction(ix: &UiInstruction, account_keys: &[Pubkey]) -> InstructionRecord {
    match ix {
        UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => InstructionRecord {
            program_id: Pubkey::from_str(&parsed.program_id).ok(),
            program: Some(parsed.program.clone()),
            parsed_text: parsed.parsed.as_str().map(str::to_string),
            data: None,
        },
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(raw)) => InstructionRecord {
            program_id: Pubkey::from_str(&raw.program_id).ok(),
            program: None,
            parsed_text: None,
            data: bs58::decode(&raw.data).into_vec().ok(),
        },
        UiInstruction::Compiled(compiled) => InstructionRecord {
            program_id: account_keys.get(compiled.program_id_index as usize).copied(),
            program: None,
            parsed_text: None,
            data: bs58::decode(&compiled.data).into_vec().ok(),
        },
    }
}

fn convert_token_balances(
    balances: OptionSerializer<Vec<UiTransactionTokenBalance>>,
) -> Vec<TokenBalanceRecord> {
    Option::<Vec<UiTransactionTokenBalance>>::from(balances)
        .unwrap_or_default()
        .into_iter()
        .map(|balance| TokenBalanceRecord {
            owner: Option::<String>::from(balance.owner)
                .and_then(|owner| Pubkey::from_str(&owner).ok()),
            mint: Pubkey::from_str(&balance.mint).unwrap_or_default(),
            ui_amount: balance
                .ui_token_amount
                .ui_amount_string
                .parse::<Decimal>()
                .unwrap_or_default(),
        })
        .collect()
}
