//! Oracle appointment, update and removal.
//!
//! The `OracleTokenCurrency` rows of an oracle are derived from its latest
//! view, so every change (and every restore) re-derives them.

use async_trait::async_trait;

use dfindex_codec::{opcodes, DfTx};
use dfindex_core::{DfTxOperation, IndexContext, Indexer, IndexerError, IndexerResult};
use dfindex_storage::{Database, Key, ModelDatabase};

use super::block_ref;
use crate::history::{self, HistoryEvent};
use crate::models::{Oracle, OracleTokenCurrency};

pub struct OracleIndexer;

fn oracle(ctx: &IndexContext<'_>, id: &str) -> IndexerResult<Oracle> {
    ctx.db
        .get_model::<Oracle>(&Key::from(id))?
        .ok_or_else(|| IndexerError::not_found("Oracle", id))
}

/// Replace the subscriptions of `before` with those of `after`.
fn sync_subscriptions(
    db: &dyn Database,
    before: Option<&Oracle>,
    after: Option<&Oracle>,
) -> IndexerResult<()> {
    if let Some(before) = before {
        for pair in &before.price_feeds {
            db.delete_model::<OracleTokenCurrency>(&OracleTokenCurrency::key(pair, &before.id))?;
        }
    }
    if let Some(after) = after {
        for pair in &after.price_feeds {
            db.put_model(&OracleTokenCurrency {
                token: pair.token.clone(),
                currency: pair.currency.clone(),
                oracle_id: after.id.clone(),
                weightage: after.weightage,
                block: after.block.clone(),
            })?;
        }
    }
    Ok(())
}

impl OracleIndexer {
    fn apply(
        &self,
        ctx: &IndexContext<'_>,
        op: &DfTxOperation,
        before: Option<Oracle>,
        after: Option<Oracle>,
        event: HistoryEvent,
    ) -> IndexerResult<()> {
        let id = match (&before, &after) {
            (_, Some(oracle)) | (Some(oracle), None) => oracle.id.clone(),
            (None, None) => return Ok(()),
        };
        sync_subscriptions(ctx.db, before.as_ref(), after.as_ref())?;
        history::record(ctx, op, Key::Str(id), event, after)
    }
}

#[async_trait]
impl Indexer for OracleIndexer {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[
            opcodes::APPOINT_ORACLE,
            opcodes::UPDATE_ORACLE,
            opcodes::REMOVE_ORACLE,
        ]
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::AppointOracle(data) => {
                    let appointed = Oracle {
                        id: op.txid.clone(),
                        owner_script: data.script.clone(),
                        weightage: data.weightage,
                        price_feeds: data.price_feeds.clone(),
                        block: block_ref(ctx, op),
                    };
                    self.apply(ctx, op, None, Some(appointed), HistoryEvent::Create)?;
                }
                DfTx::UpdateOracle(data) => {
                    let before = oracle(ctx, &data.oracle_id)?;
                    let updated = Oracle {
                        id: before.id.clone(),
                        owner_script: data.script.clone(),
                        weightage: data.weightage,
                        price_feeds: data.price_feeds.clone(),
                        block: block_ref(ctx, op),
                    };
                    self.apply(ctx, op, Some(before), Some(updated), HistoryEvent::Update)?;
                }
                DfTx::RemoveOracle(data) => {
                    let before = oracle(ctx, &data.oracle_id)?;
                    self.apply(ctx, op, Some(before), None, HistoryEvent::Destroy)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            let id = match &op.dftx {
                DfTx::AppointOracle(_) => op.txid.clone(),
                DfTx::UpdateOracle(data) => data.oracle_id.clone(),
                DfTx::RemoveOracle(data) => data.oracle_id.clone(),
                _ => continue,
            };
            let key = Key::Str(id);
            let current = ctx.db.get_model::<Oracle>(&key)?;
            let restored = history::revert::<Oracle>(ctx, op, &key)?;
            sync_subscriptions(ctx.db, current.as_ref(), restored.as_ref())?;
        }
        Ok(())
    }
}
