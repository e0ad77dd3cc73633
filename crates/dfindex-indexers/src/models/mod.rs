//! Read models materialized by the indexers.

pub mod loan;
pub mod masternode;
pub mod oracle;
pub mod pool;
pub mod token;
pub mod vault;

pub use loan::{
    CollateralToken, DefaultLoanScheme, DeferredDestroyLoanScheme, DeferredLoanScheme, LoanScheme,
    LoanToken,
};
pub use masternode::Masternode;
pub use oracle::{
    ActivePrice, Oracle, OracleCount, OraclePriceActive, OraclePriceAggregated, OraclePriceFeed,
    OracleTokenCurrency, PriceTicker, pair_key,
};
pub use pool::{PoolPair, PoolSide, PoolSwap};
pub use token::Token;
pub use vault::{Vault, VaultAuctionBid};

use serde::{Deserialize, Serialize};

/// Where an entity was created or last touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub height: u32,
    pub txid: String,
}
