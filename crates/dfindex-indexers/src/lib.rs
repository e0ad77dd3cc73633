//! dfindex-indexers: read models and the indexers that maintain them.
//!
//! ```text
//! default_indexers()
//!   token        T M         (DFI seeded at genesis)
//!   masternode   C R
//!   oracle       o t h       → OracleTokenCurrency
//!   oracle_price y           → OraclePriceFeed, OraclePriceAggregated, PriceTicker
//!   active_price (interval)  → OraclePriceActive
//!   pool_pair    p u l r
//!   pool_swap    s i         → PoolSwap per hop
//!   loan_scheme  L d D       (deferred activation)
//!   loan_token   c g x
//!   vault        V v S J X H e
//!   auction      I
//! ```
//!
//! Mutable views are rebuilt from their [`history`] on invalidate; facts
//! (feeds, aggregates, swaps, bids) have deterministic keys and are deleted.

pub mod deferred;
pub mod history;
pub mod indexers;
pub mod math;
pub mod models;

use std::sync::Arc;

use dfindex_core::Indexer;

pub use deferred::{DeferredEngine, DeferredMeta, DeferredRecord, Submission};
pub use history::{History, HistoryEvent, Tracked};
pub use indexers::auction::AuctionIndexer;
pub use indexers::loan_scheme::LoanSchemeIndexer;
pub use indexers::loan_token::LoanTokenIndexer;
pub use indexers::masternode::MasternodeIndexer;
pub use indexers::oracle::OracleIndexer;
pub use indexers::pool::PoolPairIndexer;
pub use indexers::price::{ActivePriceIndexer, SetOracleDataIndexer};
pub use indexers::swap::PoolSwapIndexer;
pub use indexers::token::TokenIndexer;
pub use indexers::vault::VaultIndexer;

/// The production indexer list, in dispatch order.
///
/// Prices are aggregated after the block's feeds are stored, and swaps and
/// vaults run after the pools, schemes and tokens they reference.
pub fn default_indexers() -> Vec<Arc<dyn Indexer>> {
    vec![
        Arc::new(TokenIndexer),
        Arc::new(MasternodeIndexer),
        Arc::new(OracleIndexer),
        Arc::new(SetOracleDataIndexer),
        Arc::new(ActivePriceIndexer),
        Arc::new(PoolPairIndexer),
        Arc::new(PoolSwapIndexer),
        Arc::new(LoanSchemeIndexer::new()),
        Arc::new(LoanTokenIndexer),
        Arc::new(VaultIndexer),
        Arc::new(AuctionIndexer),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn opcodes_have_a_single_owner() {
        let mut seen = HashSet::new();
        for indexer in default_indexers() {
            for opcode in indexer.opcodes() {
                assert!(seen.insert(*opcode), "opcode {} claimed twice", *opcode as char);
            }
        }
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = default_indexers().iter().map(|i| i.name()).collect();
        assert_eq!(names.len(), default_indexers().len());
    }
}
