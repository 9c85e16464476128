//! Confirmed transaction model and balance-delta helpers.

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

/// A token balance snapshot for one account in a transaction.
#[derive(Debug, Clone)]
pub struct TokenBalanceRecord {
    /// Owner of the token account, when the node reports it.
    pub owner: Option<Pubkey>,
    /// Token mint.
    pub mint: Pubkey,
    /// Balance in UI units.
    pub ui_amount: Decimal,
}

/// One instruction of a confirmed transaction.
#[derive(Debug, Clone, Default)]
pub struct InstructionRecord {
    /// Program id, when resolvable.
    pub program_id: Option<Pubkey>,
    /// Program name as reported by the parsed encoding (e.g. "spl-memo").
    pub program: Option<String>,
    /// Parsed instruction payload when the node decoded it to plain text.
    pub parsed_text: Option<String>,
    /// Raw instruction data for instructions the node did not parse.
    pub data: Option<Vec<u8>>,
}

/// Confirmed transaction detail, flattened from the RPC response.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    /// Transaction signature.
    pub signature: Signature,
    /// Whether the transaction succeeded on-chain.
    pub succeeded: bool,
    /// On-chain error payload for failed transactions.
    pub error: Option<String>,
    /// Network fee in lamports.
    pub fee_lamports: u64,
    /// Account keys in message order; balance vectors index into this.
    pub account_keys: Vec<Pubkey>,
    /// Lamport balances before the transaction, by account index.
    pub pre_balances: Vec<u64>,
    /// Lamport balances after the transaction, by account index.
    pub post_balances: Vec<u64>,
    /// Token balances before the transaction.
    pub pre_token_balances: Vec<TokenBalanceRecord>,
    /// Token balances after the transaction.
    pub post_token_balances: Vec<TokenBalanceRecord>,
    /// Instructions in message order.
    pub instructions: Vec<InstructionRecord>,
    /// Log messages emitted during execution.
    pub log_messages: Vec<String>,
}

impl TransactionRecord {
    /// Lamport delta (post - pre) for an owner's own account, or `None`
    /// when the owner is not an account of this transaction.
    pub fn native_delta(&self, owner: &Pubkey) -> Option<i128> {
        let index = self.account_keys.iter().position(|key| key == owner)?;
        let pre = *self.pre_balances.get(index)? as i128;
        let post = *self.post_balances.get(index)? as i128;
        Some(post - pre)
    }

    /// Token balance delta (post - pre) for `owner` in `mint`, in UI units.
    ///
    /// A balance present pre-transaction but absent post-transaction is a
    /// full exit and reconciles to zero, not to unknown. `None` only when
    /// the owner holds no balance of the mint on either side.
    pub fn token_delta(&self, owner: &Pubkey, mint: &Pubkey) -> Option<Decimal> {
        let pre = find_balance(&self.pre_token_balances, owner, mint);
        let post = find_balance(&self.post_token_balances, owner, mint);
        match (pre, post) {
            (None, None) => None,
            (pre, post) => {
                Some(post.unwrap_or(Decimal::ZERO) - pre.unwrap_or(Decimal::ZERO))
            }
        }
    }

    /// Distinct owners holding `mint` on either side of the transaction,
    /// in first-seen order.
    pub fn token_owners(&self, mint: &Pubkey) -> Vec<Pubkey> {
        let mut owners = Vec::new();
        for balance in self
            .pre_token_balances
            .iter()
            .chain(self.post_token_balances.iter())
        {
            if balance.mint != *mint {
                continue;
            }
            if let Some(owner) = balance.owner {
                if !owners.contains(&owner) {
                    owners.push(owner);
                }
            }
        }
        owners
    }
}

fn find_balance(balances: &[TokenBalanceRecord], owner: &Pubkey, mint: &Pubkey) -> Option<Decimal> {
    balances
        .iter()
        .find(|b| b.owner.as_ref() == Some(owner) && b.mint == *mint)
        .map(|b| b.ui_amount)
}
