use rust_decimal::Decimal;

/// Lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Converts a lamport amount to SOL.
pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

/// Converts a signed lamport delta to SOL, preserving sign.
pub fn signed_lamports_to_sol(lamports: i128) -> Decimal {
    Decimal::from_i128_with_scale(lamports, 0) / Decimal::from(LAMPORTS_PER_SOL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn converts_lamports_to_sol() {
        assert_eq!(lamports_to_sol(1_500_000_000), dec!(1.5));
        assert_eq!(lamports_to_sol(5_000), dec!(0.000005));
        assert_eq!(lamports_to_sol(0), dec!(0));
    }

    #[test]
    fn preserves_sign_on_deltas() {
        assert_eq!(signed_lamports_to_sol(-500_000_000), dec!(-0.5));
        assert_eq!(signed_lamports_to_sol(499_995_000), dec!(0.499995));
    }
}
