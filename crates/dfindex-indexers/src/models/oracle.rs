//! Oracles, their price feeds and the prices derived from them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dfindex_codec::CurrencyPair;
use dfindex_storage::{Key, Model, ModelIndex};

use super::BlockRef;

/// Partition key of everything indexed per price pair.
pub fn pair_key(pair: &CurrencyPair) -> Key {
    Key::Tuple(vec![
        Key::Str(pair.token.clone()),
        Key::Str(pair.currency.clone()),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Oracle {
    /// Appointing transaction id.
    pub id: String,
    pub owner_script: String,
    pub weightage: u8,
    pub price_feeds: Vec<CurrencyPair>,
    pub block: BlockRef,
}

impl Model for Oracle {
    const TYPE: &'static str = "oracle";

    fn id(&self) -> Key {
        Key::Str(self.id.clone())
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![]
    }
}

/// One oracle's subscription to one price pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleTokenCurrency {
    pub token: String,
    pub currency: String,
    pub oracle_id: String,
    pub weightage: u8,
    pub block: BlockRef,
}

impl OracleTokenCurrency {
    pub fn key(pair: &CurrencyPair, oracle_id: &str) -> Key {
        Key::Tuple(vec![
            Key::Str(pair.token.clone()),
            Key::Str(pair.currency.clone()),
            Key::Str(oracle_id.to_string()),
        ])
    }

    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.token, &self.currency)
    }
}

impl Model for OracleTokenCurrency {
    const TYPE: &'static str = "oracle_token_currency";

    fn id(&self) -> Key {
        Self::key(&self.pair(), &self.oracle_id)
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::sorted(
            "pair",
            |o: &Self| pair_key(&o.pair()),
            |o: &Self| Key::Str(o.oracle_id.clone()),
        )]
    }
}

/// A single price published by an oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraclePriceFeed {
    pub token: String,
    pub currency: String,
    pub oracle_id: String,
    pub amount: Decimal,
    /// Timestamp stated by the oracle, in seconds.
    pub time: i64,
    pub txn: u32,
    pub block: BlockRef,
}

impl OraclePriceFeed {
    pub fn key(pair: &CurrencyPair, oracle_id: &str, height: u32, txn: u32) -> Key {
        Key::Tuple(vec![
            Key::Str(pair.token.clone()),
            Key::Str(pair.currency.clone()),
            Key::Str(oracle_id.to_string()),
            Key::U32(height),
            Key::U32(txn),
        ])
    }

    /// Partition of the feeds of one oracle for one pair.
    pub fn series(pair: &CurrencyPair, oracle_id: &str) -> Key {
        Key::Tuple(vec![
            Key::Str(pair.token.clone()),
            Key::Str(pair.currency.clone()),
            Key::Str(oracle_id.to_string()),
        ])
    }

    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.token, &self.currency)
    }
}

impl Model for OraclePriceFeed {
    const TYPE: &'static str = "oracle_price_feed";

    fn id(&self) -> Key {
        Self::key(&self.pair(), &self.oracle_id, self.block.height, self.txn)
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::sorted(
            "series",
            |f: &Self| Self::series(&f.pair(), &f.oracle_id),
            |f: &Self| Key::Tuple(vec![Key::U32(f.block.height), Key::U32(f.txn)]),
        )]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OracleCount {
    pub active: u32,
    pub total: u32,
}

/// Weighted average of the live feeds of a pair at one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraclePriceAggregated {
    pub token: String,
    pub currency: String,
    pub amount: Decimal,
    pub weightage: Decimal,
    pub oracles: OracleCount,
    pub height: u32,
    pub time: i64,
}

impl OraclePriceAggregated {
    pub fn key(pair: &CurrencyPair, height: u32) -> Key {
        Key::Tuple(vec![
            Key::Str(pair.token.clone()),
            Key::Str(pair.currency.clone()),
            Key::U32(height),
        ])
    }

    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.token, &self.currency)
    }
}

impl Model for OraclePriceAggregated {
    const TYPE: &'static str = "oracle_price_aggregated";

    fn id(&self) -> Key {
        Self::key(&self.pair(), self.height)
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::sorted(
            "pair",
            |a: &Self| pair_key(&a.pair()),
            |a: &Self| Key::U32(a.height),
        )]
    }
}

/// Latest aggregated price of a pair, keyed by [`pair_key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTicker {
    /// `TOKEN-CURRENCY`
    pub id: String,
    pub price: OraclePriceAggregated,
}

impl PriceTicker {
    pub fn new(price: OraclePriceAggregated) -> Self {
        Self {
            id: price.pair().symbol(),
            price,
        }
    }
}

impl Model for PriceTicker {
    const TYPE: &'static str = "price_ticker";

    fn id(&self) -> Key {
        pair_key(&self.price.pair())
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::unique("id", |t: &Self| pair_key(&t.price.pair()))]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePrice {
    pub amount: Decimal,
    pub weightage: Decimal,
    pub oracles: OracleCount,
}

/// Price used by the loan system, refreshed every price interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraclePriceActive {
    pub token: String,
    pub currency: String,
    /// Price in force after this block.
    pub active: Option<ActivePrice>,
    /// Aggregate computed at this block, promoted or not.
    pub next: Option<ActivePrice>,
    /// `true` when `next` passed the promotion checks.
    pub is_live: bool,
    pub height: u32,
    pub time: i64,
}

impl OraclePriceActive {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.token, &self.currency)
    }
}

impl Model for OraclePriceActive {
    const TYPE: &'static str = "oracle_price_active";

    fn id(&self) -> Key {
        Key::Tuple(vec![
            Key::Str(self.token.clone()),
            Key::Str(self.currency.clone()),
            Key::U32(self.height),
        ])
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![
            ModelIndex::sorted(
                "pair",
                |a: &Self| pair_key(&a.pair()),
                |a: &Self| Key::U32(a.height),
            ),
            ModelIndex::sorted(
                "height",
                |a: &Self| Key::U32(a.height),
                |a: &Self| pair_key(&a.pair()),
            ),
        ]
    }
}

impl crate::history::Tracked for Oracle {
    const HISTORY: &'static str = "oracle_history";
}
