//! Chain-agnostic domain types for the tribute pipeline.

pub mod amount;
pub mod enums;
pub mod risk;

pub use amount::{LAMPORTS_PER_SOL, lamports_to_sol, signed_lamports_to_sol};
pub use enums::{RequestDecision, TradeDirection};
pub use risk::RiskAssessment;
