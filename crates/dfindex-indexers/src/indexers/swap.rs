//! Single and composite swaps.
//!
//! Each hop is recorded as one `PoolSwap` row with the reserves the pool
//! would hold after the hop. The `PoolPair` views themselves are left to
//! the liquidity operations.

use async_trait::async_trait;

use dfindex_codec::ops::PoolSwap as PoolSwapOp;
use dfindex_codec::{opcodes, DfTx};
use dfindex_core::{DfTxOperation, IndexContext, Indexer, IndexerError, IndexerResult};
use dfindex_storage::{Database, Key, Model, ModelDatabase, Query};

use super::pool::{pool_by_id, pool_by_tokens};
use crate::math::amm;
use crate::models::{PoolPair, PoolSwap};

/// Pools a swap goes through: the listed ones, or the direct pair.
fn route(db: &dyn Database, swap: &PoolSwapOp, pools: &[u32]) -> IndexerResult<Vec<PoolPair>> {
    if pools.is_empty() {
        return Ok(vec![pool_by_tokens(db, swap.from_token, swap.to_token)?]);
    }
    pools.iter().map(|id| pool_by_id(db, *id)).collect()
}

pub struct PoolSwapIndexer;

impl PoolSwapIndexer {
    fn execute(
        &self,
        ctx: &IndexContext<'_>,
        op: &DfTxOperation,
        swap: &PoolSwapOp,
        pools: &[u32],
    ) -> IndexerResult<()> {
        let mut token = swap.from_token;
        let mut amount = swap.from_amount;
        for (hop, pool) in route(ctx.db, swap, pools)?.iter().enumerate() {
            let (Some((reserve_in, reserve_out)), Some(to_token)) =
                (pool.reserves_from(token), pool.other(token))
            else {
                return Err(IndexerError::Invariant(format!(
                    "token {token} is not traded in pool {}",
                    pool.id
                )));
            };
            let result = amm::swap(reserve_in, reserve_out, amount, pool.commission)?;
            let (reserve_a, reserve_b) = if token == pool.token_a.token {
                (result.reserve_in, result.reserve_out)
            } else {
                (result.reserve_out, result.reserve_in)
            };
            ctx.db.put_model(&PoolSwap {
                txid: op.txid.clone(),
                txn: op.txn,
                hop: hop as u32,
                pool_id: pool.id,
                from_script: swap.from_script.clone(),
                to_script: swap.to_script.clone(),
                from_token: token,
                from_amount: amount,
                to_token,
                to_amount: result.amount_out,
                reserve_a,
                reserve_b,
                height: ctx.height(),
                time: ctx.block.time,
            })?;
            token = to_token;
            amount = result.amount_out;
        }
        if token != swap.to_token {
            return Err(IndexerError::Invariant(format!(
                "swap {} ends in token {token}, expected {}",
                op.txid, swap.to_token
            )));
        }
        tracing::debug!(txid = %op.txid, out = %amount, "swapped");
        Ok(())
    }
}

#[async_trait]
impl Indexer for PoolSwapIndexer {
    fn name(&self) -> &'static str {
        "pool_swap"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[opcodes::POOL_SWAP, opcodes::COMPOSITE_SWAP]
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::PoolSwap(swap) => self.execute(ctx, op, swap, &[])?,
                DfTx::CompositeSwap(data) => self.execute(ctx, op, &data.swap, &data.pools)?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            let hops = ctx
                .db
                .query::<PoolSwap>("txid", &Query::partition(Key::from(&op.txid)))?;
            if hops.is_empty() {
                return Err(IndexerError::HistoryMissing {
                    model: PoolSwap::TYPE,
                    id: op.txid.clone(),
                });
            }
            for hop in hops {
                ctx.db.delete_model::<PoolSwap>(&hop.id())?;
            }
        }
        Ok(())
    }
}
