//! Reorg detection and recovery.
//!
//! The node is the authority on the best chain. A reorg is detected when the
//! hash the node reports at our tip height differs from the stored tip, when
//! the node's best height drops below our tip, or when the next block's
//! parent is not our tip. Recovery invalidates the tip repeatedly until the
//! stored tip is back on the node's chain.

use crate::error::IndexerResult;
use crate::main_indexer::MainIndexer;
use crate::source::BlockSource;
use crate::types::Block;

/// Describes a completed rewind.
#[derive(Debug, Clone)]
pub struct ReorgEvent {
    /// Tip height when the fork was detected.
    pub detected_at: u32,
    /// The blocks that were invalidated, most recent first.
    pub dropped_blocks: Vec<Block>,
    /// Height of the common ancestor, `None` if everything was dropped.
    pub common_ancestor: Option<u32>,
}

impl ReorgEvent {
    pub fn depth(&self) -> usize {
        self.dropped_blocks.len()
    }
}

/// `true` if the stored `tip` is still on the node's best chain.
pub async fn is_canonical<S: BlockSource + ?Sized>(source: &S, tip: &Block) -> IndexerResult<bool> {
    let best = source.get_block_count().await?;
    if tip.height > best {
        return Ok(false);
    }
    Ok(source.get_block_hash(tip.height).await? == tip.hash)
}

/// Invalidate stored blocks until the tip is canonical again.
pub async fn rewind_to_common_ancestor<S: BlockSource + ?Sized>(
    source: &S,
    indexer: &MainIndexer,
) -> IndexerResult<ReorgEvent> {
    let detected_at = indexer.tip()?.map(|t| t.height).unwrap_or_default();
    let mut dropped_blocks = Vec::new();
    let common_ancestor = loop {
        let Some(tip) = indexer.tip()? else {
            break None;
        };
        if is_canonical(source, &tip).await? {
            break Some(tip.height);
        }
        if let Some(dropped) = indexer.invalidate_tip().await? {
            tracing::debug!(height = dropped.height, hash = %dropped.hash, "dropped block");
            dropped_blocks.push(dropped);
        }
    };

    let event = ReorgEvent {
        detected_at,
        dropped_blocks,
        common_ancestor,
    };
    tracing::warn!(
        depth = event.depth(),
        at = detected_at,
        ancestor = ?common_ancestor,
        "Reorg recovered"
    );
    Ok(event)
}
