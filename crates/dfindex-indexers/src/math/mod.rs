//! Monetary math shared by the pool and oracle indexers.

pub mod amm;
pub mod price;

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places of every on-chain amount.
pub const AMOUNT_DP: u32 = 8;

/// Truncate to on-chain precision.
pub fn truncate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::ToZero)
}

/// Round half away from zero to on-chain precision.
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Zero at on-chain precision, so sums and differences of amounts keep a
/// stable serialized form.
pub const ZERO_AMOUNT: Decimal = Decimal::from_parts(0, 0, 0, false, AMOUNT_DP);
