//! Oracle price aggregation and active-price promotion.

use rust_decimal::Decimal;

use dfindex_codec::CurrencyPair;
use dfindex_core::{IndexerResult, RawBlock};
use dfindex_storage::{Database, ModelDatabase, Query};

use super::round;
use crate::models::{
    pair_key, ActivePrice, OracleCount, OraclePriceAggregated, OraclePriceFeed, OracleTokenCurrency,
};

/// Feeds further than this from the block time are ignored (seconds).
pub const FEED_WINDOW_SECS: i64 = 3600;

/// Oracles needed before an aggregate may become the active price.
pub const MIN_LIVE_ORACLES: u32 = 2;

/// Largest relative move accepted between consecutive active prices.
pub const MAX_DEVIATION: Decimal = Decimal::from_parts(3, 0, 0, false, 1);

/// Weighted average of `(amount, weightage)` pairs, rounded to 8 dp.
/// `None` when the total weight is zero.
pub fn weighted_average(feeds: &[(Decimal, Decimal)]) -> Option<Decimal> {
    let weight: Decimal = feeds.iter().map(|(_, w)| *w).sum();
    if weight.is_zero() {
        return None;
    }
    let total: Decimal = feeds.iter().map(|(amount, w)| amount * w).sum();
    Some(round(total / weight))
}

/// Aggregate the latest feed of every oracle subscribed to `pair`.
pub fn aggregate_price(
    db: &dyn Database,
    pair: &CurrencyPair,
    block: &RawBlock,
) -> IndexerResult<Option<OraclePriceAggregated>> {
    let subscriptions = db.query::<OracleTokenCurrency>("pair", &Query::partition(pair_key(pair)))?;

    let mut feeds = Vec::new();
    for subscription in subscriptions.iter().filter(|s| s.weightage > 0) {
        let latest = db
            .query::<OraclePriceFeed>(
                "series",
                &Query::partition(OraclePriceFeed::series(pair, &subscription.oracle_id))
                    .desc()
                    .limit(1),
            )?
            .into_iter()
            .next();
        let Some(feed) = latest else { continue };
        if (feed.time - block.time).abs() > FEED_WINDOW_SECS {
            tracing::trace!(pair = %pair.symbol(), oracle = %feed.oracle_id, "stale feed");
            continue;
        }
        feeds.push((feed.amount, Decimal::from(subscription.weightage)));
    }

    let Some(amount) = weighted_average(&feeds) else {
        return Ok(None);
    };
    Ok(Some(OraclePriceAggregated {
        token: pair.token.clone(),
        currency: pair.currency.clone(),
        amount,
        weightage: feeds.iter().map(|(_, w)| *w).sum(),
        oracles: OracleCount {
            active: feeds.len() as u32,
            total: subscriptions.len() as u32,
        },
        height: block.height,
        time: block.time,
    }))
}

impl From<&OraclePriceAggregated> for ActivePrice {
    fn from(aggregated: &OraclePriceAggregated) -> Self {
        Self {
            amount: aggregated.amount,
            weightage: aggregated.weightage,
            oracles: aggregated.oracles,
        }
    }
}

/// Candidate active price taken from the latest aggregate of a pair. An
/// aggregate computed outside the feed window of `block` offers none.
pub fn next_active(latest: &OraclePriceAggregated, block: &RawBlock) -> Option<ActivePrice> {
    if (block.time - latest.time).abs() > FEED_WINDOW_SECS {
        return None;
    }
    Some(ActivePrice::from(latest))
}

/// `true` when `next` may replace `previous` as the active price.
pub fn is_promotable(previous: Option<&ActivePrice>, next: &ActivePrice) -> bool {
    if next.oracles.active < MIN_LIVE_ORACLES {
        return false;
    }
    match previous {
        Some(previous) if !previous.amount.is_zero() => {
            let deviation = ((next.amount - previous.amount) / previous.amount).abs();
            deviation <= MAX_DEVIATION
        }
        _ => true,
    }
}
