//! Constant-product pool arithmetic.

use rust_decimal::{Decimal, MathematicalOps};

use dfindex_core::{IndexerError, IndexerResult};

use super::truncate;

/// Liquidity locked forever by the first provider (1000 satoshis).
pub const MINIMUM_LIQUIDITY: Decimal = Decimal::from_parts(1000, 0, 0, false, 8);

/// Result of adding liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Minted {
    /// Shares credited to the provider.
    pub liquidity: Decimal,
    /// Pool total after the add, including the locked minimum.
    pub total_liquidity: Decimal,
}

pub fn add_liquidity(
    reserve_a: Decimal,
    reserve_b: Decimal,
    total_liquidity: Decimal,
    amount_a: Decimal,
    amount_b: Decimal,
) -> IndexerResult<Minted> {
    if amount_a <= Decimal::ZERO || amount_b <= Decimal::ZERO {
        return Err(IndexerError::Invariant(format!(
            "liquidity amounts must be positive, got {amount_a} and {amount_b}"
        )));
    }

    if total_liquidity.is_zero() {
        let root = (amount_a * amount_b)
            .sqrt()
            .ok_or_else(|| IndexerError::Invariant("liquidity square root overflow".into()))?;
        let liquidity = truncate(root) - MINIMUM_LIQUIDITY;
        if liquidity <= Decimal::ZERO {
            return Err(IndexerError::Invariant(format!(
                "initial liquidity {root} does not exceed the locked minimum"
            )));
        }
        return Ok(Minted {
            liquidity,
            total_liquidity: MINIMUM_LIQUIDITY + liquidity,
        });
    }

    if reserve_a.is_zero() || reserve_b.is_zero() {
        return Err(IndexerError::Invariant(
            "pool has shares but an empty reserve".into(),
        ));
    }
    let by_a = truncate(amount_a * total_liquidity / reserve_a);
    let by_b = truncate(amount_b * total_liquidity / reserve_b);
    let liquidity = by_a.min(by_b);
    Ok(Minted {
        liquidity,
        total_liquidity: total_liquidity + liquidity,
    })
}

/// Amounts returned for burning `amount` shares.
pub fn remove_liquidity(
    reserve_a: Decimal,
    reserve_b: Decimal,
    total_liquidity: Decimal,
    amount: Decimal,
) -> IndexerResult<(Decimal, Decimal)> {
    if amount <= Decimal::ZERO || amount > total_liquidity - MINIMUM_LIQUIDITY {
        return Err(IndexerError::Invariant(format!(
            "cannot remove {amount} shares from a pool holding {total_liquidity}"
        )));
    }
    Ok((
        truncate(amount * reserve_a / total_liquidity),
        truncate(amount * reserve_b / total_liquidity),
    ))
}

/// One swap hop through a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub amount_out: Decimal,
    pub reserve_in: Decimal,
    pub reserve_out: Decimal,
}

/// Constant-product swap of `amount_in` after commission.
pub fn swap(
    reserve_in: Decimal,
    reserve_out: Decimal,
    amount_in: Decimal,
    commission: Decimal,
) -> IndexerResult<Hop> {
    if reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
        return Err(IndexerError::Invariant("swap through an empty pool".into()));
    }
    let net_in = truncate(amount_in * (Decimal::ONE - commission));
    let new_in = reserve_in + net_in;
    let new_out = truncate(reserve_in * reserve_out / new_in);
    Ok(Hop {
        amount_out: reserve_out - new_out,
        reserve_in: new_in,
        reserve_out: new_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn first_add_locks_minimum() {
        let minted = add_liquidity(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, d("100"), d("400")).unwrap();
        assert_eq!(minted.liquidity, d("199.99999"));
        assert_eq!(minted.total_liquidity, d("200"));
    }

    #[test]
    fn later_add_takes_the_smaller_share() {
        let minted = add_liquidity(d("100"), d("400"), d("200"), d("10"), d("80")).unwrap();
        assert_eq!(minted.liquidity, d("20"));
        assert_eq!(minted.total_liquidity, d("220"));
    }

    #[test]
    fn remove_is_proportional_and_truncated() {
        let (a, b) = remove_liquidity(d("100"), d("300"), d("300"), d("1")).unwrap();
        assert_eq!(a, d("0.33333333"));
        assert_eq!(b, d("1"));
        assert!(remove_liquidity(d("100"), d("300"), d("300"), d("300")).is_err());
    }

    #[test]
    fn swap_keeps_the_product() {
        let hop = swap(d("100"), d("200"), d("10"), Decimal::ZERO).unwrap();
        assert_eq!(hop.reserve_in, d("110"));
        assert_eq!(hop.reserve_out, d("181.81818181"));
        assert_eq!(hop.amount_out, d("18.18181819"));
    }

    #[test]
    fn swap_deducts_commission() {
        let hop = swap(d("100"), d("100"), d("10"), d("0.1")).unwrap();
        assert_eq!(hop.reserve_in, d("109"));
        assert_eq!(hop.reserve_out, d("91.74311926"));
    }
}
