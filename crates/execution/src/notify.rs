//! Announcement and rejection-message ports.
//!
//! Announcements are best-effort: the processor fires them and moves on,
//! and a failing notifier can never stall the pipeline.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};

/// Best-effort announcement sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn announce(&self, text: &str) -> Result<()>;
}

/// Notifier that writes announcements to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn announce(&self, text: &str) -> Result<()> {
        info!(text = %text, "Announcement");
        Ok(())
    }
}

/// Fans one announcement out to several notifiers. Every notifier runs even
/// when earlier ones fail.
pub struct MultiNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    async fn announce(&self, text: &str) -> Result<()> {
        let mut failed = 0usize;
        for notifier in &self.notifiers {
            if let Err(err) = notifier.announce(text).await {
                warn!(error = %err, "Notifier failed");
                failed += 1;
            }
        }
        if failed > 0 {
            anyhow::bail!("{failed} of {} notifiers failed", self.notifiers.len());
        }
        Ok(())
    }
}

/// Context for composing a rejection message.
#[derive(Debug, Clone)]
pub struct RejectionContext {
    /// Wallet whose request was rejected.
    pub requester: Pubkey,
    /// Mint the request concerned.
    pub target_mint: Pubkey,
    /// Risks the analyzer reported.
    pub risks: Vec<String>,
}

/// Optional external message generator for rejection announcements.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn rejection_message(&self, context: &RejectionContext) -> Result<String>;
}

/// Detail templates keyed by risk keywords; the first risk containing a
/// known keyword picks the template.
const FALLBACK_DETAILS: &[(&str, &str)] = &[
    ("mint authority", "the mint authority can still print more supply"),
    ("freeze", "the freeze authority can lock holders out"),
    ("liquidity", "there is not enough liquidity to get back out"),
    ("holder", "supply is concentrated in a handful of wallets"),
    ("honeypot", "sells look blocked"),
];

const GENERIC_DETAIL: &str = "the risk check flagged it";

/// Deterministic rejection message used when no generator is configured or
/// the generator fails.
pub fn fallback_rejection(context: &RejectionContext) -> String {
    let detail = context
        .risks
        .iter()
        .find_map(|risk| {
            let lower = risk.to_lowercase();
            FALLBACK_DETAILS
                .iter()
                .find(|(keyword, _)| lower.contains(keyword))
                .map(|(_, detail)| *detail)
        })
        .unwrap_or(GENERIC_DETAIL);
    format!("Request for {} rejected: {detail}.", context.target_mint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(risks: &[&str]) -> RejectionContext {
        RejectionContext {
            requester: Pubkey::new_unique(),
            target_mint: Pubkey::new_unique(),
            risks: risks.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn first_risk_with_known_keyword_picks_the_detail() {
        let ctx = context(&["Top holder owns 60% of supply", "Freeze authority enabled"]);
        let message = fallback_rejection(&ctx);

        assert!(message.contains("concentrated in a handful of wallets"));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let ctx = context(&["Mint Authority still enabled"]);

        assert!(fallback_rejection(&ctx).contains("print more supply"));
    }

    #[test]
    fn unknown_risks_fall_back_to_the_generic_detail() {
        let ctx = context(&["something novel"]);

        assert!(fallback_rejection(&ctx).contains(GENERIC_DETAIL));
    }

    #[test]
    fn empty_risks_fall_back_to_the_generic_detail() {
        let ctx = context(&[]);

        assert!(fallback_rejection(&ctx).contains(GENERIC_DETAIL));
    }

    #[tokio::test]
    async fn multi_notifier_runs_every_notifier() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counting(Arc<AtomicUsize>, bool);

        #[async_trait]
        impl Notifier for Counting {
            async fn announce(&self, _text: &str) -> Result<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                if self.1 {
                    anyhow::bail!("boom");
                }
                Ok(())
            }
        }

        let count = Arc::new(AtomicUsize::new(0));
        let multi = MultiNotifier::new(vec![
            Arc::new(Counting(count.clone(), true)),
            Arc::new(Counting(count.clone(), false)),
        ]);

        assert!(multi.announce("gm").await.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
