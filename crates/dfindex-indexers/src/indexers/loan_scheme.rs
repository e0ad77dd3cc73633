//! Loan schemes: deferred updates and destructions, plus the default pointer.

use async_trait::async_trait;

use dfindex_codec::ops::{DestroyLoanScheme, SetLoanScheme, ACTIVATE_NOW};
use dfindex_codec::{opcodes, DfTx};
use dfindex_core::{DfTxOperation, IndexContext, Indexer, IndexerError, IndexerResult};
use dfindex_storage::{Key, ModelDatabase};

use super::block_ref;
use crate::deferred::{DeferredEngine, DeferredMeta};
use crate::history::{self, HistoryEvent};
use crate::models::{DefaultLoanScheme, DeferredDestroyLoanScheme, DeferredLoanScheme, LoanScheme};

/// Effective activation height of a requested one: `0` and [`ACTIVATE_NOW`]
/// mean the current block.
pub fn activation_height(requested: u64, height: u32) -> u32 {
    if requested == 0 || requested == ACTIVATE_NOW {
        return height;
    }
    u32::try_from(requested).unwrap_or(u32::MAX).max(height)
}

fn ensure_scheme(ctx: &IndexContext<'_>, id: &str) -> IndexerResult<LoanScheme> {
    ctx.db
        .get_model::<LoanScheme>(&Key::from(id))?
        .ok_or_else(|| IndexerError::not_found("LoanScheme", id))
}

#[derive(Default)]
pub struct LoanSchemeIndexer {
    updates: DeferredEngine<DeferredLoanScheme>,
    destructions: DeferredEngine<DeferredDestroyLoanScheme>,
}

impl LoanSchemeIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_meta(ctx: &IndexContext<'_>, op: &DfTxOperation, data: &SetLoanScheme) -> DeferredMeta {
        DeferredMeta::new(
            ctx,
            op,
            Key::from(&data.identifier),
            activation_height(data.update, ctx.height()),
        )
    }

    fn destroy_meta(ctx: &IndexContext<'_>, op: &DfTxOperation, data: &DestroyLoanScheme) -> DeferredMeta {
        DeferredMeta::new(
            ctx,
            op,
            Key::from(&data.identifier),
            activation_height(data.height, ctx.height()),
        )
    }

    fn set(&self, ctx: &IndexContext<'_>, op: &DfTxOperation, data: &SetLoanScheme) -> IndexerResult<()> {
        let meta = Self::update_meta(ctx, op, data);
        let scheme = LoanScheme {
            id: data.identifier.clone(),
            ratio: data.ratio,
            rate: data.rate,
            activation_height: meta.activation_height,
            block: block_ref(ctx, op),
        };
        let outcome = self.updates.submit(ctx, DeferredLoanScheme { meta, scheme })?;
        tracing::debug!(id = %data.identifier, ?outcome, "loan scheme set");
        Ok(())
    }

    fn destroy(&self, ctx: &IndexContext<'_>, op: &DfTxOperation, data: &DestroyLoanScheme) -> IndexerResult<()> {
        ensure_scheme(ctx, &data.identifier)?;
        let meta = Self::destroy_meta(ctx, op, data);
        let outcome = self
            .destructions
            .submit(ctx, DeferredDestroyLoanScheme { meta })?;
        tracing::debug!(id = %data.identifier, ?outcome, "loan scheme destroyed");
        Ok(())
    }
}

#[async_trait]
impl Indexer for LoanSchemeIndexer {
    fn name(&self) -> &'static str {
        "loan_scheme"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[
            opcodes::SET_LOAN_SCHEME,
            opcodes::SET_DEFAULT_LOAN_SCHEME,
            opcodes::DESTROY_LOAN_SCHEME,
        ]
    }

    async fn index_block_start(&self, ctx: &IndexContext<'_>) -> IndexerResult<()> {
        self.updates.activate(ctx)?;
        self.destructions.activate(ctx)?;
        Ok(())
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::SetLoanScheme(data) => self.set(ctx, op, data)?,
                DfTx::SetDefaultLoanScheme(data) => {
                    ensure_scheme(ctx, &data.identifier)?;
                    let pointer = DefaultLoanScheme {
                        scheme_id: data.identifier.clone(),
                        block: block_ref(ctx, op),
                    };
                    history::record(ctx, op, DefaultLoanScheme::key(), HistoryEvent::Update, Some(pointer))?;
                }
                DfTx::DestroyLoanScheme(data) => self.destroy(ctx, op, data)?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::SetLoanScheme(data) => {
                    self.updates.withdraw(ctx, &Self::update_meta(ctx, op, data))?;
                }
                DfTx::SetDefaultLoanScheme(_) => {
                    history::revert::<DefaultLoanScheme>(ctx, op, &DefaultLoanScheme::key())?;
                }
                DfTx::DestroyLoanScheme(data) => {
                    self.destructions.withdraw(ctx, &Self::destroy_meta(ctx, op, data))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn invalidate_block_end(&self, ctx: &IndexContext<'_>) -> IndexerResult<()> {
        self.updates.deactivate(ctx)?;
        self.destructions.deactivate(ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_sentinels_mean_now() {
        assert_eq!(activation_height(0, 50), 50);
        assert_eq!(activation_height(ACTIVATE_NOW, 50), 50);
        assert_eq!(activation_height(40, 50), 50);
        assert_eq!(activation_height(60, 50), 60);
        assert_eq!(activation_height(u64::from(u32::MAX) + 1, 50), u32::MAX);
    }
}
