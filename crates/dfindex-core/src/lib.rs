//! dfindex-core: block types, the indexer contract and the per-block
//! dispatcher of the dfindex read-model indexer.
//!
//! # Architecture
//!
//! ```text
//! BlockSource (node) → IndexLoop ──┬── reorg detection / rewind
//!                                  └── MainIndexer
//!                                        ├── decode DfTx once per tx
//!                                        ├── Vec<Arc<dyn Indexer>> (fixed order)
//!                                        └── StagedDatabase → one commit per block
//! ```

pub mod config;
pub mod error;
pub mod indexer;
pub mod logging;
pub mod main_indexer;
pub mod network;
pub mod reorg;
pub mod source;
pub mod sync;
pub mod types;

pub use config::{IndexerBuilder, IndexerConfig, IndexerState};
pub use error::{IndexerError, IndexerResult};
pub use indexer::{DfTxOperation, IndexContext, Indexer};
pub use logging::{init_tracing, LogConfig};
pub use main_indexer::MainIndexer;
pub use network::Network;
pub use reorg::ReorgEvent;
pub use source::{BlockSource, MemoryBlockSource};
pub use sync::{IndexLoop, SyncOutcome};
pub use types::{Block, RawBlock, ScriptPubKey, Transaction, Vin, Vout};
