//! The node port and an in-memory chain implementing it.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{IndexerError, IndexerResult};
use crate::types::RawBlock;

/// Read access to the node's best chain.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Height of the node's best block.
    async fn get_block_count(&self) -> IndexerResult<u32>;

    /// Hash of the best-chain block at `height`.
    async fn get_block_hash(&self, height: u32) -> IndexerResult<String>;

    /// Full block with decoded transactions (`getblock <hash> 2`).
    async fn get_block(&self, hash: &str) -> IndexerResult<RawBlock>;
}

/// Best chain plus every block ever seen, so stale hashes stay fetchable.
#[derive(Default)]
struct ChainState {
    best: Vec<String>,
    blocks: HashMap<String, RawBlock>,
}

/// A chain held in memory; used for replaying exported blocks and in tests.
#[derive(Default)]
pub struct MemoryBlockSource {
    state: tokio::sync::RwLock<ChainState>,
}

impl MemoryBlockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from blocks ordered by height.
    pub fn from_blocks(blocks: impl IntoIterator<Item = RawBlock>) -> Self {
        let mut state = ChainState::default();
        for block in blocks {
            state.best.push(block.hash.clone());
            state.blocks.insert(block.hash.clone(), block);
        }
        Self {
            state: tokio::sync::RwLock::new(state),
        }
    }

    /// Append a block to the best chain.
    pub async fn push(&self, block: RawBlock) {
        let mut state = self.state.write().await;
        state.best.push(block.hash.clone());
        state.blocks.insert(block.hash.clone(), block);
    }

    /// Replace the best chain from the first new block's height upward.
    pub async fn reorg(&self, blocks: Vec<RawBlock>) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if let Some(first) = blocks.first() {
            let known = &state.blocks;
            let keep = state
                .best
                .iter()
                .position(|hash| known.get(hash).is_some_and(|b| b.height >= first.height))
                .unwrap_or(state.best.len());
            state.best.truncate(keep);
        }
        for block in blocks {
            state.best.push(block.hash.clone());
            state.blocks.insert(block.hash.clone(), block);
        }
    }

    fn height_of(state: &ChainState, index: usize) -> Option<u32> {
        state
            .best
            .get(index)
            .and_then(|hash| state.blocks.get(hash))
            .map(|b| b.height)
    }
}

#[async_trait]
impl BlockSource for MemoryBlockSource {
    async fn get_block_count(&self) -> IndexerResult<u32> {
        let state = self.state.read().await;
        match state.best.len() {
            0 => Err(IndexerError::Rpc("chain is empty".into())),
            n => Self::height_of(&state, n - 1)
                .ok_or_else(|| IndexerError::Rpc("best chain references an unknown block".into())),
        }
    }

    async fn get_block_hash(&self, height: u32) -> IndexerResult<String> {
        let state = self.state.read().await;
        state
            .best
            .iter()
            .find(|hash| state.blocks.get(*hash).map(|b| b.height) == Some(height))
            .cloned()
            .ok_or_else(|| IndexerError::Rpc(format!("Block height {height} out of range")))
    }

    async fn get_block(&self, hash: &str) -> IndexerResult<RawBlock> {
        self.state
            .read()
            .await
            .blocks
            .get(hash)
            .cloned()
            .ok_or_else(|| IndexerError::Rpc(format!("Block {hash} not found")))
    }
}
