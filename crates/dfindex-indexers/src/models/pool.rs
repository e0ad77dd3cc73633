//! Liquidity pools and the swaps made through them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dfindex_codec::TokenBalance;
use dfindex_storage::{Key, Model, ModelIndex};

use super::BlockRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSide {
    pub token: u32,
    pub reserve: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolPair {
    /// Also the id of the pool's liquidity share token.
    pub id: u32,
    pub symbol: String,
    pub token_a: PoolSide,
    pub token_b: PoolSide,
    pub commission: Decimal,
    pub total_liquidity: Decimal,
    pub status: bool,
    pub owner_script: String,
    pub custom_rewards: Vec<TokenBalance>,
    pub creation: BlockRef,
}

impl PoolPair {
    /// Partition of the `pair` index: the two token ids, lower first.
    pub fn pair_key(a: u32, b: u32) -> Key {
        Key::Tuple(vec![Key::U32(a.min(b)), Key::U32(a.max(b))])
    }

    /// Reserves ordered as `(from, to)` for a swap out of `from`.
    pub fn reserves_from(&self, from: u32) -> Option<(Decimal, Decimal)> {
        if from == self.token_a.token {
            Some((self.token_a.reserve, self.token_b.reserve))
        } else if from == self.token_b.token {
            Some((self.token_b.reserve, self.token_a.reserve))
        } else {
            None
        }
    }

    /// The token on the other side of `token`.
    pub fn other(&self, token: u32) -> Option<u32> {
        if token == self.token_a.token {
            Some(self.token_b.token)
        } else if token == self.token_b.token {
            Some(self.token_a.token)
        } else {
            None
        }
    }
}

impl Model for PoolPair {
    const TYPE: &'static str = "pool_pair";

    fn id(&self) -> Key {
        Key::U32(self.id)
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::unique("pair", |p: &Self| {
            Self::pair_key(p.token_a.token, p.token_b.token)
        })]
    }
}

/// One hop of a swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSwap {
    pub txid: String,
    pub txn: u32,
    pub hop: u32,
    pub pool_id: u32,
    pub from_script: String,
    pub to_script: String,
    pub from_token: u32,
    pub from_amount: Decimal,
    pub to_token: u32,
    pub to_amount: Decimal,
    /// Pool reserves after the hop, in the pool's `token_a`/`token_b` order.
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    pub height: u32,
    pub time: i64,
}

impl Model for PoolSwap {
    const TYPE: &'static str = "pool_swap";

    fn id(&self) -> Key {
        Key::Tuple(vec![Key::Str(self.txid.clone()), Key::U32(self.hop)])
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![
            ModelIndex::sorted(
                "pool",
                |s: &Self| Key::U32(s.pool_id),
                |s: &Self| Key::Tuple(vec![Key::U32(s.height), Key::U32(s.txn), Key::U32(s.hop)]),
            ),
            ModelIndex::sorted(
                "txid",
                |s: &Self| Key::Str(s.txid.clone()),
                |s: &Self| Key::U32(s.hop),
            ),
        ]
    }
}

impl crate::history::Tracked for PoolPair {
    const HISTORY: &'static str = "pool_pair_history";
}
