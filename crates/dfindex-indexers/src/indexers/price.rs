//! Oracle price feeds, per-block aggregates and interval active prices.

use std::collections::BTreeSet;

use async_trait::async_trait;

use dfindex_codec::{opcodes, CurrencyPair, DfTx};
use dfindex_core::{DfTxOperation, IndexContext, Indexer, IndexerError, IndexerResult};
use dfindex_storage::{Key, Model, ModelDatabase, Query};

use super::block_ref;
use crate::math::price::{aggregate_price, is_promotable, next_active};
use crate::models::{
    pair_key, Oracle, OraclePriceActive, OraclePriceAggregated, OraclePriceFeed, PriceTicker,
};

/// Every `(pair, feed id)` published by the SetOracleData operations.
fn feeds_of(ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> Vec<(CurrencyPair, OraclePriceFeed)> {
    let mut feeds = Vec::new();
    for op in ops {
        let DfTx::SetOracleData(data) = &op.dftx else {
            continue;
        };
        for token_price in &data.token_prices {
            for price in &token_price.prices {
                let pair = CurrencyPair::new(&token_price.token, &price.currency);
                feeds.push((
                    pair,
                    OraclePriceFeed {
                        token: token_price.token.clone(),
                        currency: price.currency.clone(),
                        oracle_id: data.oracle_id.clone(),
                        amount: price.amount,
                        time: data.timestamp,
                        txn: op.txn,
                        block: block_ref(ctx, op),
                    },
                ));
            }
        }
    }
    feeds
}

/// Stores price feeds and refreshes the aggregate of every pair they touch.
pub struct SetOracleDataIndexer;

#[async_trait]
impl Indexer for SetOracleDataIndexer {
    fn name(&self) -> &'static str {
        "oracle_price"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[opcodes::SET_ORACLE_DATA]
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            if let DfTx::SetOracleData(data) = &op.dftx {
                if ctx.db.get_model::<Oracle>(&Key::from(&data.oracle_id))?.is_none() {
                    return Err(IndexerError::not_found("Oracle", &data.oracle_id));
                }
            }
        }

        let mut touched = BTreeSet::new();
        for (pair, feed) in feeds_of(ctx, ops) {
            ctx.db.put_model(&feed)?;
            touched.insert(pair);
        }

        for pair in &touched {
            let Some(aggregated) = aggregate_price(ctx.db, pair, ctx.block)? else {
                continue;
            };
            tracing::debug!(pair = %pair.symbol(), amount = %aggregated.amount, "aggregated price");
            ctx.db.put_model(&aggregated)?;
            ctx.db.put_model(&PriceTicker::new(aggregated))?;
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        let mut touched = BTreeSet::new();
        for (pair, feed) in feeds_of(ctx, ops) {
            ctx.db.delete_model::<OraclePriceFeed>(&feed_id(&feed))?;
            touched.insert(pair);
        }

        for pair in &touched {
            ctx.db
                .delete_model::<OraclePriceAggregated>(&OraclePriceAggregated::key(pair, ctx.height()))?;
            let previous = ctx
                .db
                .query::<OraclePriceAggregated>("pair", &Query::partition(pair_key(pair)).desc().limit(1))?
                .into_iter()
                .next();
            match previous {
                Some(price) => ctx.db.put_model(&PriceTicker::new(price))?,
                None => ctx.db.delete_model::<PriceTicker>(&pair_key(pair))?,
            }
        }
        Ok(())
    }
}

fn feed_id(feed: &OraclePriceFeed) -> Key {
    OraclePriceFeed::key(&feed.pair(), &feed.oracle_id, feed.block.height, feed.txn)
}

/// Promotes the latest aggregate of every ticker to active price at each
/// price interval.
pub struct ActivePriceIndexer;

impl ActivePriceIndexer {
    fn is_interval(ctx: &IndexContext<'_>) -> bool {
        ctx.height() % ctx.network.price_interval() == 0
    }
}

#[async_trait]
impl Indexer for ActivePriceIndexer {
    fn name(&self) -> &'static str {
        "active_price"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[]
    }

    async fn index(&self, ctx: &IndexContext<'_>, _ops: &[DfTxOperation]) -> IndexerResult<()> {
        if !Self::is_interval(ctx) {
            return Ok(());
        }
        let tickers = ctx.db.query::<PriceTicker>("id", &Query::new())?;
        for ticker in &tickers {
            let pair = ticker.price.pair();
            let previous = ctx
                .db
                .query::<OraclePriceActive>("pair", &Query::partition(pair_key(&pair)).desc().limit(1))?
                .into_iter()
                .next()
                .and_then(|p| p.active);
            // The ticker row holds the latest aggregate of the pair.
            let next = next_active(&ticker.price, ctx.block);
            let is_live = next
                .as_ref()
                .is_some_and(|n| is_promotable(previous.as_ref(), n));
            let active = if is_live { next.clone() } else { previous };
            if !is_live {
                tracing::debug!(pair = %pair.symbol(), height = ctx.height(), "active price not promoted");
            }
            ctx.db.put_model(&OraclePriceActive {
                token: pair.token,
                currency: pair.currency,
                active,
                next,
                is_live,
                height: ctx.height(),
                time: ctx.block.time,
            })?;
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, _ops: &[DfTxOperation]) -> IndexerResult<()> {
        if !Self::is_interval(ctx) {
            return Ok(());
        }
        let written = ctx
            .db
            .query::<OraclePriceActive>("height", &Query::partition(Key::U32(ctx.height())))?;
        for price in written {
            ctx.db.delete_model::<OraclePriceActive>(&price.id())?;
        }
        Ok(())
    }
}
