//! Pool creation, updates and liquidity.

use async_trait::async_trait;
use rust_decimal::Decimal;

use dfindex_codec::ops::{CreatePoolPair, PoolAddLiquidity, UpdatePoolPair};
use dfindex_codec::{opcodes, DfTx};
use dfindex_core::{DfTxOperation, IndexContext, Indexer, IndexerError, IndexerResult};
use dfindex_storage::{Database, Key, ModelDatabase};

use super::block_ref;
use super::token::{next_token_id, token_created_by};
use crate::history::{self, HistoryEvent};
use crate::math::{amm, ZERO_AMOUNT};
use crate::models::{PoolPair, PoolSide, Token};

pub fn pool_by_id(db: &dyn Database, id: u32) -> IndexerResult<PoolPair> {
    db.get_model::<PoolPair>(&Key::U32(id))?
        .ok_or_else(|| IndexerError::not_found("PoolPair", id))
}

pub fn pool_by_tokens(db: &dyn Database, a: u32, b: u32) -> IndexerResult<PoolPair> {
    db.get_by_index::<PoolPair>("pair", &PoolPair::pair_key(a, b), None)?
        .ok_or_else(|| IndexerError::not_found("PoolPair", format!("{a}-{b}")))
}

fn token(db: &dyn Database, id: u32) -> IndexerResult<Token> {
    db.get_model::<Token>(&Key::U32(id))?
        .ok_or_else(|| IndexerError::not_found("Token", id))
}

/// Amounts of an add-liquidity operation summed per token, in pool order.
fn liquidity_amounts(data: &PoolAddLiquidity) -> IndexerResult<[(u32, Decimal); 2]> {
    let mut sums: Vec<(u32, Decimal)> = Vec::new();
    for balance in data.from.iter().flat_map(|s| &s.balances) {
        match sums.iter_mut().find(|(token, _)| *token == balance.token) {
            Some((_, amount)) => *amount += balance.amount,
            None => sums.push((balance.token, balance.amount)),
        }
    }
    match sums.as_slice() {
        [a, b] => Ok([*a, *b]),
        _ => Err(IndexerError::Invariant(format!(
            "add liquidity needs exactly two tokens, got {}",
            sums.len()
        ))),
    }
}

/// Pool id touched by an operation, for invalidation.
fn pool_of(db: &dyn Database, op: &DfTxOperation) -> IndexerResult<Option<u32>> {
    Ok(match &op.dftx {
        DfTx::CreatePoolPair(_) => Some(token_created_by(db, &op.txid)?.id),
        DfTx::UpdatePoolPair(data) => Some(data.pool_id),
        DfTx::PoolAddLiquidity(data) => {
            let [(a, _), (b, _)] = liquidity_amounts(data)?;
            Some(pool_by_tokens(db, a, b)?.id)
        }
        DfTx::PoolRemoveLiquidity(data) => Some(data.token),
        _ => None,
    })
}

pub struct PoolPairIndexer;

impl PoolPairIndexer {
    fn create(&self, ctx: &IndexContext<'_>, op: &DfTxOperation, data: &CreatePoolPair) -> IndexerResult<()> {
        let token_a = token(ctx.db, data.token_a)?;
        let token_b = token(ctx.db, data.token_b)?;
        if ctx
            .db
            .get_by_index::<PoolPair>("pair", &PoolPair::pair_key(data.token_a, data.token_b), None)?
            .is_some()
        {
            return Err(IndexerError::Invariant(format!(
                "pool {}-{} already exists",
                token_a.symbol, token_b.symbol
            )));
        }

        let id = next_token_id(ctx.db, true)?;
        let symbol = if data.pair_symbol.is_empty() {
            format!("{}-{}", token_a.symbol, token_b.symbol)
        } else {
            data.pair_symbol.clone()
        };
        ctx.db.put_model(&Token {
            id,
            symbol: symbol.clone(),
            name: format!("{}-{} LP Token", token_a.name, token_b.name),
            decimal: 8,
            limit: ZERO_AMOUNT,
            is_dat: true,
            is_lps: true,
            is_loan_token: false,
            tradeable: true,
            mintable: false,
            minted: ZERO_AMOUNT,
            creation: Some(block_ref(ctx, op)),
        })?;

        let pool = PoolPair {
            id,
            symbol,
            token_a: PoolSide {
                token: data.token_a,
                reserve: ZERO_AMOUNT,
            },
            token_b: PoolSide {
                token: data.token_b,
                reserve: ZERO_AMOUNT,
            },
            commission: data.commission,
            total_liquidity: ZERO_AMOUNT,
            status: data.status,
            owner_script: data.owner_address.clone(),
            custom_rewards: data.custom_rewards.clone(),
            creation: block_ref(ctx, op),
        };
        tracing::debug!(id, symbol = %pool.symbol, "pool created");
        history::record(ctx, op, Key::U32(id), HistoryEvent::Create, Some(pool))
    }

    fn update(&self, ctx: &IndexContext<'_>, op: &DfTxOperation, data: &UpdatePoolPair) -> IndexerResult<()> {
        let mut pool = pool_by_id(ctx.db, data.pool_id)?;
        pool.status = data.status;
        // a negative commission leaves it unchanged
        if data.commission >= Decimal::ZERO {
            pool.commission = data.commission;
        }
        if !data.owner_address.is_empty() {
            pool.owner_script = data.owner_address.clone();
        }
        if !data.custom_rewards.is_empty() {
            pool.custom_rewards = data.custom_rewards.clone();
        }
        history::record(ctx, op, Key::U32(pool.id), HistoryEvent::Update, Some(pool))
    }

    fn add(&self, ctx: &IndexContext<'_>, op: &DfTxOperation, data: &PoolAddLiquidity) -> IndexerResult<()> {
        let [(first, first_amount), (second, second_amount)] = liquidity_amounts(data)?;
        let mut pool = pool_by_tokens(ctx.db, first, second)?;
        let (amount_a, amount_b) = if pool.token_a.token == first {
            (first_amount, second_amount)
        } else {
            (second_amount, first_amount)
        };
        let minted = amm::add_liquidity(
            pool.token_a.reserve,
            pool.token_b.reserve,
            pool.total_liquidity,
            amount_a,
            amount_b,
        )?;
        pool.token_a.reserve += amount_a;
        pool.token_b.reserve += amount_b;
        pool.total_liquidity = minted.total_liquidity;
        tracing::debug!(pool = pool.id, shares = %minted.liquidity, "liquidity added");
        history::record(ctx, op, Key::U32(pool.id), HistoryEvent::AddLiquidity, Some(pool))
    }

    fn remove(&self, ctx: &IndexContext<'_>, op: &DfTxOperation, pool_id: u32, amount: Decimal) -> IndexerResult<()> {
        let mut pool = pool_by_id(ctx.db, pool_id)?;
        let (amount_a, amount_b) = amm::remove_liquidity(
            pool.token_a.reserve,
            pool.token_b.reserve,
            pool.total_liquidity,
            amount,
        )?;
        pool.token_a.reserve -= amount_a;
        pool.token_b.reserve -= amount_b;
        pool.total_liquidity -= amount;
        history::record(ctx, op, Key::U32(pool.id), HistoryEvent::RemoveLiquidity, Some(pool))
    }
}

#[async_trait]
impl Indexer for PoolPairIndexer {
    fn name(&self) -> &'static str {
        "pool_pair"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[
            opcodes::CREATE_POOL_PAIR,
            opcodes::UPDATE_POOL_PAIR,
            opcodes::POOL_ADD_LIQUIDITY,
            opcodes::POOL_REMOVE_LIQUIDITY,
        ]
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::CreatePoolPair(data) => self.create(ctx, op, data)?,
                DfTx::UpdatePoolPair(data) => self.update(ctx, op, data)?,
                DfTx::PoolAddLiquidity(data) => self.add(ctx, op, data)?,
                DfTx::PoolRemoveLiquidity(data) => self.remove(ctx, op, data.token, data.amount)?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            let Some(pool_id) = pool_of(ctx.db, op)? else {
                continue;
            };
            history::revert::<PoolPair>(ctx, op, &Key::U32(pool_id))?;
            if matches!(op.dftx, DfTx::CreatePoolPair(_)) {
                ctx.db.delete_model::<Token>(&Key::U32(pool_id))?;
            }
        }
        Ok(())
    }
}
