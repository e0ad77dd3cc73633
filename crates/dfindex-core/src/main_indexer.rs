//! The per-block dispatcher.
//!
//! ```text
//! index(block)                          invalidate(block)
//!   stage                                 stage
//!   put RawBlock + Block                  decode ops once
//!   decode ops once                       for indexer in order:
//!   for indexer in order:                   invalidate(ops, reversed)
//!     index_block_start                     invalidate_block_end
//!     index(ops owned by indexer)         delete RawBlock + Block
//!   commit                                commit
//! ```
//!
//! Any error drops the stage, so a failed block leaves no trace and can be
//! retried from scratch.

use std::sync::Arc;

use dfindex_codec::{decode_script_hex, Decoded};
use dfindex_storage::{Database, Key, ModelDatabase, Query, StagedDatabase};

use crate::config::IndexerConfig;
use crate::error::{IndexerError, IndexerResult};
use crate::indexer::{DfTxOperation, IndexContext, Indexer};
use crate::network::Network;
use crate::types::{Block, RawBlock};

pub struct MainIndexer {
    db: Arc<dyn Database>,
    network: Network,
    history_page_size: usize,
    indexers: Vec<Arc<dyn Indexer>>,
}

impl MainIndexer {
    /// `indexers` run in the given order for both index and invalidate.
    pub fn new(db: Arc<dyn Database>, network: Network, indexers: Vec<Arc<dyn Indexer>>) -> Self {
        Self {
            db,
            network,
            history_page_size: 100,
            indexers,
        }
    }

    pub fn from_config(
        db: Arc<dyn Database>,
        config: &IndexerConfig,
        indexers: Vec<Arc<dyn Indexer>>,
    ) -> Self {
        Self::new(db, config.network, indexers).with_history_page_size(config.history_page_size)
    }

    pub fn with_history_page_size(mut self, size: usize) -> Self {
        self.history_page_size = size.max(1);
        self
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn indexer_names(&self) -> Vec<&'static str> {
        self.indexers.iter().map(|i| i.name()).collect()
    }

    /// Highest indexed block.
    pub fn tip(&self) -> IndexerResult<Option<Block>> {
        let latest = self
            .db
            .query::<Block>("height", &Query::new().desc().limit(1))?;
        Ok(latest.into_iter().next())
    }

    pub fn raw_block(&self, hash: &str) -> IndexerResult<Option<RawBlock>> {
        Ok(self.db.get_model::<RawBlock>(&Key::from(hash))?)
    }

    /// Decode the marker output of every transaction once.
    pub fn decode_operations(block: &RawBlock) -> IndexerResult<Vec<DfTxOperation>> {
        let mut ops = Vec::new();
        for (txn, tx) in block.tx.iter().enumerate() {
            let Some(script) = tx.marker_script() else {
                continue;
            };
            let decoded = decode_script_hex(script).map_err(|source| IndexerError::Decode {
                txid: tx.txid.clone(),
                source,
            })?;
            match decoded {
                Decoded::Operation(dftx) => ops.push(DfTxOperation {
                    txn: txn as u32,
                    txid: tx.txid.clone(),
                    dftx,
                }),
                Decoded::Unrecognized => {
                    tracing::trace!(txid = %tx.txid, "no DfTx marker");
                }
            }
        }
        Ok(ops)
    }

    fn owned(indexer: &dyn Indexer, ops: &[DfTxOperation]) -> Vec<DfTxOperation> {
        let opcodes = indexer.opcodes();
        ops.iter()
            .filter(|op| opcodes.contains(&op.dftx.opcode()))
            .cloned()
            .collect()
    }

    /// Apply `block` on top of the current tip, atomically.
    pub async fn index(&self, block: &RawBlock) -> IndexerResult<()> {
        if let Some(tip) = self.tip()? {
            if !tip.is_parent_of(block) {
                return Err(IndexerError::Discontinuity {
                    expected: format!("{} (height {})", tip.hash, tip.height + 1),
                    actual: format!(
                        "{} (height {}, parent {})",
                        block.hash,
                        block.height,
                        block.previous_hash.as_deref().unwrap_or("none")
                    ),
                });
            }
        }

        let stage = StagedDatabase::new(self.db.clone());
        stage.put_model(block)?;
        stage.put_model(&Block::from(block))?;

        let ops = Self::decode_operations(block)?;
        let ctx = IndexContext {
            block,
            db: &stage,
            network: self.network,
            history_page_size: self.history_page_size,
        };

        for indexer in &self.indexers {
            indexer.index_block_start(&ctx).await?;
            let owned = Self::owned(indexer.as_ref(), &ops);
            for op in &owned {
                tracing::debug!(
                    indexer = indexer.name(),
                    txid = %op.txid,
                    op = op.dftx.name(),
                    "indexing operation"
                );
            }
            indexer.index(&ctx, &owned).await?;
        }

        let writes = stage.commit()?;
        tracing::info!(
            height = block.height,
            hash = %block.hash,
            operations = ops.len(),
            writes,
            "indexed block"
        );
        Ok(())
    }

    /// Roll back `block`, which must be the current tip, atomically.
    pub async fn invalidate(&self, block: &RawBlock) -> IndexerResult<()> {
        match self.tip()? {
            Some(tip) if tip.hash == block.hash => {}
            Some(tip) => {
                return Err(IndexerError::Discontinuity {
                    expected: tip.hash,
                    actual: block.hash.clone(),
                })
            }
            None => {
                return Err(IndexerError::Invariant(format!(
                    "cannot invalidate block {} on an empty index",
                    block.hash
                )))
            }
        }

        let stage = StagedDatabase::new(self.db.clone());
        let mut ops = Self::decode_operations(block)?;
        ops.reverse();
        let ctx = IndexContext {
            block,
            db: &stage,
            network: self.network,
            history_page_size: self.history_page_size,
        };

        for indexer in &self.indexers {
            let owned = Self::owned(indexer.as_ref(), &ops);
            indexer.invalidate(&ctx, &owned).await?;
            indexer.invalidate_block_end(&ctx).await?;
        }

        stage.delete_model::<Block>(&Key::from(&block.hash))?;
        stage.delete_model::<RawBlock>(&Key::from(&block.hash))?;
        let writes = stage.commit()?;
        tracing::info!(
            height = block.height,
            hash = %block.hash,
            operations = ops.len(),
            writes,
            "invalidated block"
        );
        Ok(())
    }

    /// Invalidate the current tip using its stored raw block.
    /// Returns the summary of the dropped block, or `None` on an empty index.
    pub async fn invalidate_tip(&self) -> IndexerResult<Option<Block>> {
        let Some(tip) = self.tip()? else {
            return Ok(None);
        };
        let raw = self
            .raw_block(&tip.hash)?
            .ok_or(IndexerError::MissingRawBlock { height: tip.height })?;
        self.invalidate(&raw).await?;
        Ok(Some(tip))
    }
}
