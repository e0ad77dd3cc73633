//! The per-operation indexer contract.

use async_trait::async_trait;

use dfindex_codec::DfTx;
use dfindex_storage::Database;

use crate::error::IndexerResult;
use crate::network::Network;
use crate::types::RawBlock;

/// A decoded operation together with its position in the block.
#[derive(Debug, Clone, PartialEq)]
pub struct DfTxOperation {
    /// Index of the transaction within the block.
    pub txn: u32,
    pub txid: String,
    pub dftx: DfTx,
}

/// Context passed to every indexer hook.
///
/// `db` is the staged view of the block being applied: writes are visible to
/// later reads within the block and become durable only when the whole block
/// commits.
pub struct IndexContext<'a> {
    pub block: &'a RawBlock,
    pub db: &'a dyn Database,
    pub network: Network,
    /// Rows fetched per page when scanning history backwards.
    pub history_page_size: usize,
}

impl IndexContext<'_> {
    pub fn height(&self) -> u32 {
        self.block.height
    }
}

/// One component per operation family.
///
/// `index` and `invalidate` must be exact mirrors: invalidating a block
/// leaves every model this indexer touched byte-identical to its state
/// before the block was indexed.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Name used in log fields.
    fn name(&self) -> &'static str;

    /// Opcodes this indexer consumes. Operations with other opcodes are
    /// filtered out before `index`/`invalidate` are called.
    fn opcodes(&self) -> &'static [u8];

    /// Runs once per block, before `index`.
    async fn index_block_start(&self, _ctx: &IndexContext<'_>) -> IndexerResult<()> {
        Ok(())
    }

    /// Apply the matching operations of the block, in transaction order.
    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()>;

    /// Undo the matching operations, given in reverse transaction order.
    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()>;

    /// Runs once per block, after `invalidate`; mirrors `index_block_start`.
    async fn invalidate_block_end(&self, _ctx: &IndexContext<'_>) -> IndexerResult<()> {
        Ok(())
    }
}
