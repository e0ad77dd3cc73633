//! The sync loop: follow the node's best chain one block at a time.
//!
//! Each `sync_once` call does at most one unit of work: rewind a reorg,
//! index the next block, or report that the store is up to date. `run`
//! repeats it, sleeping `poll_interval_ms` only when caught up, and checks
//! the shutdown signal between blocks.

use std::time::Duration;

use tokio::sync::watch;

use crate::config::{IndexerConfig, IndexerState};
use crate::error::{IndexerError, IndexerResult};
use crate::main_indexer::MainIndexer;
use crate::reorg::{is_canonical, rewind_to_common_ancestor, ReorgEvent};
use crate::source::BlockSource;

/// Result of one sync step.
#[derive(Debug)]
pub enum SyncOutcome {
    Indexed { height: u32 },
    Reorg(ReorgEvent),
    UpToDate { height: Option<u32> },
}

pub struct IndexLoop<S: BlockSource> {
    config: IndexerConfig,
    source: S,
    indexer: MainIndexer,
    state: IndexerState,
}

impl<S: BlockSource> IndexLoop<S> {
    pub fn new(config: IndexerConfig, source: S, indexer: MainIndexer) -> Self {
        Self {
            config,
            source,
            indexer,
            state: IndexerState::Idle,
        }
    }

    pub fn state(&self) -> IndexerState {
        self.state
    }

    pub fn indexer(&self) -> &MainIndexer {
        &self.indexer
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// One unit of work.
    pub async fn sync_once(&mut self) -> IndexerResult<SyncOutcome> {
        let tip = self.indexer.tip()?;

        if let Some(tip) = &tip {
            if !is_canonical(&self.source, tip).await? {
                return self.recover().await;
            }
        }

        let best = self.source.get_block_count().await?;
        let next = match &tip {
            Some(tip) => tip.height + 1,
            None => self.config.start_height,
        };
        if next > best {
            return Ok(SyncOutcome::UpToDate {
                height: tip.map(|t| t.height),
            });
        }

        let hash = self.source.get_block_hash(next).await?;
        let block = self.source.get_block(&hash).await?;
        if block.height != next {
            return Err(IndexerError::Aborted {
                reason: format!(
                    "node returned block {} at height {} for height {next}",
                    block.hash, block.height
                ),
            });
        }
        if let Some(tip) = &tip {
            if !tip.is_parent_of(&block) {
                // the node switched chains between our two calls
                return self.recover().await;
            }
        }

        self.indexer.index(&block).await?;
        Ok(SyncOutcome::Indexed {
            height: block.height,
        })
    }

    async fn recover(&mut self) -> IndexerResult<SyncOutcome> {
        self.state = IndexerState::ReorgRecovery;
        let event = rewind_to_common_ancestor(&self.source, &self.indexer).await?;
        self.state = IndexerState::Syncing;
        Ok(SyncOutcome::Reorg(event))
    }

    /// Run until `shutdown` carries `true`.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> IndexerResult<()> {
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        self.state = IndexerState::Syncing;
        tracing::info!(
            id = %self.config.id,
            network = %self.config.network,
            indexers = self.indexer.indexer_names().len(),
            "Starting index loop"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let idle = match self.sync_once().await {
                Ok(SyncOutcome::Indexed { .. }) => {
                    self.state = IndexerState::Syncing;
                    false
                }
                Ok(SyncOutcome::Reorg(_)) => false,
                Ok(SyncOutcome::UpToDate { .. }) => {
                    self.state = IndexerState::Live;
                    true
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(error = %err, "Sync step failed, retrying");
                    true
                }
                Err(err) => {
                    tracing::error!(error = %err, "Sync stopped");
                    self.state = IndexerState::Error;
                    return Err(err);
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        self.state = IndexerState::Stopped;
        tracing::info!(id = %self.config.id, "Index loop stopped");
        Ok(())
    }
}
