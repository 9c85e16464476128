//! Ground-truth trade reconciliation.
//!
//! Requested amounts are never trusted once a trade confirms: slippage and
//! fees make them diverge from what actually happened. The reconciler
//! derives realized amounts from confirmed balance deltas only.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tracing::{debug, warn};
use tribute_chain::TransactionFetcher;
use tribute_chain::error::ChainError;
use tribute_chain::transaction::TransactionRecord;
use tribute_domain::{TradeDirection, lamports_to_sol, signed_lamports_to_sol};

/// Configuration for the settlement poll.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Interval between reconciliation attempts.
    pub poll_interval: Duration,
    /// Wall-clock budget for the poll.
    pub poll_budget: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            poll_budget: Duration::from_secs(60),
        }
    }
}

/// Realized economics of one confirmed trade for one owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealizedTrade {
    /// Trade transaction signature.
    pub signature: Signature,
    /// Trade direction relative to the target mint.
    pub direction: TradeDirection,
    /// Target mint.
    pub mint: Pubkey,
    /// Target tokens exchanged, in UI units.
    pub token_amount: Decimal,
    /// SOL exchanged, network fee excluded on both sides.
    pub sol_amount: Decimal,
    /// SOL per token; zero when no tokens moved.
    pub price_per_token: Decimal,
    /// Network fee in SOL.
    pub network_fee: Decimal,
    /// Whether the trade landed successfully on-chain.
    pub success: bool,
    /// On-chain error payload for failed or absent transactions.
    pub error: Option<String>,
}

impl RealizedTrade {
    fn failed(
        signature: Signature,
        direction: TradeDirection,
        mint: Pubkey,
        error: Option<String>,
        network_fee: Option<Decimal>,
    ) -> Self {
        Self {
            signature,
            direction,
            mint,
            token_amount: Decimal::ZERO,
            sol_amount: Decimal::ZERO,
            price_per_token: Decimal::ZERO,
            network_fee: network_fee.unwrap_or(Decimal::ZERO),
            success: false,
            error,
        }
    }
}

/// Result of the bounded settlement poll.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// A definitive on-chain result, successful or not.
    Settled(RealizedTrade),
    /// The budget ran out with no definitive result.
    TimedOut,
}

/// Derives realized trade amounts from confirmed ledger state.
pub struct TradeReconciler<F> {
    fetcher: Arc<F>,
    config: ReconcilerConfig,
}

impl<F: TransactionFetcher> TradeReconciler<F> {
    /// Creates a reconciler over the given fetcher.
    pub fn new(fetcher: Arc<F>, config: ReconcilerConfig) -> Self {
        Self { fetcher, config }
    }

    /// Reconciles one signature for `owner`. An absent transaction is a
    /// failure result, not an error; only transport failures error.
    pub async fn reconcile(
        &self,
        signature: &Signature,
        owner: &Pubkey,
        mint: &Pubkey,
        direction: TradeDirection,
    ) -> Result<RealizedTrade, ChainError> {
        match self.fetcher.fetch(signature).await? {
            Some(record) => Ok(realize(&record, owner, mint, direction)),
            None => {
                debug!(signature = %signature, "Transaction not found for reconciliation");
                Ok(RealizedTrade::failed(
                    *signature,
                    direction,
                    *mint,
                    Some("transaction not found".to_string()),
                    None,
                ))
            }
        }
    }

    /// Polls until the transaction is visible or the budget runs out.
    /// Transport errors are absorbed and retried within the budget.
    pub async fn await_settlement(
        &self,
        signature: &Signature,
        owner: &Pubkey,
        mint: &Pubkey,
        direction: TradeDirection,
    ) -> SettlementOutcome {
        let deadline = tokio::time::Instant::now() + self.config.poll_budget;

        loop {
            match self.fetcher.fetch(signature).await {
                Ok(Some(record)) => {
                    return SettlementOutcome::Settled(realize(&record, owner, mint, direction));
                }
                Ok(None) => {
                    debug!(signature = %signature, "Transaction not yet visible");
                }
                Err(err) => {
                    warn!(signature = %signature, error = %err, "Reconciliation fetch failed");
                }
            }

            if tokio::time::Instant::now() + self.config.poll_interval > deadline {
                warn!(signature = %signature, "Settlement poll budget exhausted");
                return SettlementOutcome::TimedOut;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

/// The realized-amount contract: both directions report fee-exclusive SOL.
/// A buy's cost excludes the network fee; a sell's proceeds add it back so
/// the figure is gross of the network cost.
fn realize(
    record: &TransactionRecord,
    owner: &Pubkey,
    mint: &Pubkey,
    direction: TradeDirection,
) -> RealizedTrade {
    let network_fee = lamports_to_sol(record.fee_lamports);

    if !record.succeeded {
        return RealizedTrade::failed(
            record.signature,
            direction,
            *mint,
            record.error.clone(),
            Some(network_fee),
        );
    }

    let native_delta = record.native_delta(owner).unwrap_or(0);
    let native_moved = signed_lamports_to_sol(native_delta).abs();
    let token_amount = record
        .token_delta(owner, mint)
        .map(|delta| delta.abs())
        .unwrap_or(Decimal::ZERO);

    let sol_amount = match direction {
        TradeDirection::Buy => native_moved - network_fee,
        TradeDirection::Sell => native_moved + network_fee,
    };
    let price_per_token = if token_amount > Decimal::ZERO {
        sol_amount / token_amount
    } else {
        // Zero-volume anomaly rather than a division error.
        Decimal::ZERO
    };

    RealizedTrade {
        signature: record.signature,
        direction,
        mint: *mint,
        token_amount,
        sol_amount,
        price_per_token,
        network_fee,
        success: true,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StaticFetcher;
    use rust_decimal_macros::dec;
    use tribute_chain::transaction::TokenBalanceRecord;

    fn trade_record(
        owner: Pubkey,
        mint: Pubkey,
        pre_lamports: u64,
        post_lamports: u64,
        pre_tokens: Option<Decimal>,
        post_tokens: Option<Decimal>,
    ) -> TransactionRecord {
        let token_balance = |amount: Decimal| TokenBalanceRecord {
            owner: Some(owner),
            mint,
            ui_amount: amount,
        };
        TransactionRecord {
            signature: Signature::new_unique(),
            succeeded: true,
            error: None,
            fee_lamports: 5_000,
            account_keys: vec![owner],
            pre_balances: vec![pre_lamports],
            post_balances: vec![post_lamports],
            pre_token_balances: pre_tokens.map(token_balance).into_iter().collect(),
            post_token_balances: post_tokens.map(token_balance).into_iter().collect(),
            instructions: Vec::new(),
            log_messages: Vec::new(),
        }
    }

    fn reconciler(fetcher: StaticFetcher) -> TradeReconciler<StaticFetcher> {
        TradeReconciler::new(Arc::new(fetcher), ReconcilerConfig::default())
    }

    #[tokio::test]
    async fn buy_excludes_the_network_fee_from_cost() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        // Native delta -0.5 SOL (fee included), +1000 tokens.
        let record = trade_record(
            owner,
            mint,
            2_000_000_000,
            1_500_000_000,
            None,
            Some(dec!(1000)),
        );
        let signature = record.signature;
        let reconciler = reconciler(StaticFetcher::with_record(record));

        let trade = reconciler
            .reconcile(&signature, &owner, &mint, TradeDirection::Buy)
            .await
            .unwrap();

        assert!(trade.success);
        assert_eq!(trade.token_amount, dec!(1000));
        assert_eq!(trade.sol_amount, dec!(0.499995));
        assert_eq!(trade.price_per_token, dec!(0.000499995));
        assert_eq!(trade.network_fee, dec!(0.000005));
    }

    #[tokio::test]
    async fn full_exit_sell_attributes_the_whole_balance() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        // 250 tokens pre, no post-balance at all: a full exit, not unknown.
        let record = trade_record(
            owner,
            mint,
            1_000_000_000,
            1_099_995_000,
            Some(dec!(250)),
            None,
        );
        let signature = record.signature;
        let reconciler = reconciler(StaticFetcher::with_record(record));

        let trade = reconciler
            .reconcile(&signature, &owner, &mint, TradeDirection::Sell)
            .await
            .unwrap();

        assert_eq!(trade.token_amount, dec!(250));
        // Proceeds are gross of the fee: |0.099995| + 0.000005.
        assert_eq!(trade.sol_amount, dec!(0.1));
    }

    #[tokio::test]
    async fn failed_transaction_reports_error_and_fee_only() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let mut record = trade_record(owner, mint, 1_000_000_000, 999_995_000, None, None);
        record.succeeded = false;
        record.error = Some("InstructionError(2, Custom(6001))".to_string());
        let signature = record.signature;
        let reconciler = reconciler(StaticFetcher::with_record(record));

        let trade = reconciler
            .reconcile(&signature, &owner, &mint, TradeDirection::Buy)
            .await
            .unwrap();

        assert!(!trade.success);
        assert_eq!(trade.error.as_deref(), Some("InstructionError(2, Custom(6001))"));
        assert_eq!(trade.network_fee, dec!(0.000005));
        assert_eq!(trade.token_amount, dec!(0));
        assert_eq!(trade.sol_amount, dec!(0));
    }

    #[tokio::test]
    async fn absent_transaction_is_a_failure_result() {
        let reconciler = reconciler(StaticFetcher::new());

        let trade = reconciler
            .reconcile(
                &Signature::new_unique(),
                &Pubkey::new_unique(),
                &Pubkey::new_unique(),
                TradeDirection::Buy,
            )
            .await
            .unwrap();

        assert!(!trade.success);
        assert_eq!(trade.error.as_deref(), Some("transaction not found"));
    }

    #[tokio::test]
    async fn zero_token_volume_reports_zero_price() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let record = trade_record(owner, mint, 1_000_000_000, 999_995_000, None, None);
        let signature = record.signature;
        let reconciler = reconciler(StaticFetcher::with_record(record));

        let trade = reconciler
            .reconcile(&signature, &owner, &mint, TradeDirection::Buy)
            .await
            .unwrap();

        assert_eq!(trade.token_amount, dec!(0));
        assert_eq!(trade.price_per_token, dec!(0));
    }

    #[tokio::test(start_paused = true)]
    async fn settlement_poll_times_out_when_nothing_lands() {
        let reconciler = TradeReconciler::new(
            Arc::new(StaticFetcher::new()),
            ReconcilerConfig {
                poll_interval: Duration::from_millis(100),
                poll_budget: Duration::from_millis(350),
            },
        );

        let outcome = reconciler
            .await_settlement(
                &Signature::new_unique(),
                &Pubkey::new_unique(),
                &Pubkey::new_unique(),
                TradeDirection::Buy,
            )
            .await;

        assert!(matches!(outcome, SettlementOutcome::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn settlement_poll_returns_once_the_trade_lands() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let record = trade_record(
            owner,
            mint,
            2_000_000_000,
            1_500_000_000,
            None,
            Some(dec!(1000)),
        );
        let signature = record.signature;

        let fetcher = Arc::new(StaticFetcher::new());
        let reconciler = TradeReconciler::new(
            fetcher.clone(),
            ReconcilerConfig {
                poll_interval: Duration::from_millis(100),
                poll_budget: Duration::from_secs(10),
            },
        );

        let poller = tokio::spawn({
            let reconciler = Arc::new(reconciler);
            async move {
                reconciler
                    .await_settlement(&signature, &owner, &mint, TradeDirection::Buy)
                    .await
            }
        });
        // Land the trade while the poller is sleeping between attempts.
        tokio::time::sleep(Duration::from_millis(250)).await;
        fetcher.put(record);

        match poller.await.unwrap() {
            SettlementOutcome::Settled(trade) => {
                assert!(trade.success);
                assert_eq!(trade.token_amount, dec!(1000));
            }
            SettlementOutcome::TimedOut => panic!("expected settlement"),
        }
    }
}
