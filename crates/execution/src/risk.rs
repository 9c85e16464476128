//! Risk analysis port.

use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use tribute_domain::RiskAssessment;

/// External risk analyzer for a target mint.
///
/// The processor races this call against a deadline; implementations do not
/// need their own timeout handling.
#[async_trait]
pub trait RiskAnalyzer: Send + Sync {
    async fn analyze(&self, mint: &Pubkey) -> Result<RiskAssessment>;
}
