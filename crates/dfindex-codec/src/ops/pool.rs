//! Pool operations: `p` create, `u` update, `l` add liquidity,
//! `r` remove liquidity, `s` swap, `i` composite swap.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DecodeResult;
use crate::reader::{BufferReader, COIN_SCALE};
use crate::types::{Payload, ScriptBalances, TokenBalance};
use crate::writer::BufferWriter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePoolPair {
    pub token_a: u32,
    pub token_b: u32,
    /// Fraction of the input kept by the pool, 0..=1.
    pub commission: Decimal,
    pub owner_address: String,
    pub status: bool,
    pub pair_symbol: String,
    pub custom_rewards: Vec<TokenBalance>,
}

impl Payload for CreatePoolPair {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        let token_a = r.read_varint()?;
        let token_b = r.read_varint()?;
        let commission = r.read_amount()?;
        let owner_address = r.read_script()?;
        let status = r.read_bool()?;
        let pair_symbol = r.read_string()?;
        // optional since the custom rewards fork
        let custom_rewards = if r.is_empty() {
            Vec::new()
        } else {
            r.read_vec(TokenBalance::decode)?
        };
        Ok(Self {
            token_a,
            token_b,
            commission,
            owner_address,
            status,
            pair_symbol,
            custom_rewards,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_varint(self.token_a);
        w.write_varint(self.token_b);
        w.write_amount(&self.commission);
        w.write_script(&self.owner_address);
        w.write_bool(self.status);
        w.write_string(&self.pair_symbol);
        if !self.custom_rewards.is_empty() {
            w.write_vec(&self.custom_rewards, |w, b| b.encode(w));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePoolPair {
    pub pool_id: u32,
    pub status: bool,
    pub commission: Decimal,
    pub owner_address: String,
    pub custom_rewards: Vec<TokenBalance>,
}

impl Payload for UpdatePoolPair {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        let pool_id = r.read_varint()?;
        let status = r.read_bool()?;
        let commission = r.read_amount()?;
        let owner_address = r.read_script()?;
        let custom_rewards = if r.is_empty() {
            Vec::new()
        } else {
            r.read_vec(TokenBalance::decode)?
        };
        Ok(Self {
            pool_id,
            status,
            commission,
            owner_address,
            custom_rewards,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_varint(self.pool_id);
        w.write_bool(self.status);
        w.write_amount(&self.commission);
        w.write_script(&self.owner_address);
        if !self.custom_rewards.is_empty() {
            w.write_vec(&self.custom_rewards, |w, b| b.encode(w));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolAddLiquidity {
    pub from: Vec<ScriptBalances>,
    pub share_address: String,
}

impl Payload for PoolAddLiquidity {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            from: r.read_vec(ScriptBalances::decode)?,
            share_address: r.read_script()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_vec(&self.from, |w, s| s.encode(w));
        w.write_script(&self.share_address);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolRemoveLiquidity {
    pub script: String,
    /// Liquidity token (the pool id).
    pub token: u32,
    pub amount: Decimal,
}

impl Payload for PoolRemoveLiquidity {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            script: r.read_script()?,
            token: r.read_varint()?,
            amount: r.read_amount()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_script(&self.script);
        w.write_varint(self.token);
        w.write_amount(&self.amount);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSwap {
    pub from_script: String,
    pub from_token: u32,
    pub from_amount: Decimal,
    pub to_script: String,
    pub to_token: u32,
    pub max_price: Decimal,
}

impl Payload for PoolSwap {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        let from_script = r.read_script()?;
        let from_token = r.read_varint()?;
        let from_amount = r.read_amount()?;
        let to_script = r.read_script()?;
        let to_token = r.read_varint()?;
        // max price is split into an integer part and a satoshi fraction
        let integer = r.read_i64()?;
        let fraction = r.read_i64()?;
        Ok(Self {
            from_script,
            from_token,
            from_amount,
            to_script,
            to_token,
            max_price: Decimal::from(integer) + Decimal::new(fraction, COIN_SCALE),
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_script(&self.from_script);
        w.write_varint(self.from_token);
        w.write_amount(&self.from_amount);
        w.write_script(&self.to_script);
        w.write_varint(self.to_token);
        let integer = self.max_price.trunc();
        w.write_i64(integer.to_i64().unwrap_or(i64::MAX));
        w.write_amount(&(self.max_price - integer));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSwap {
    pub swap: PoolSwap,
    /// Pool ids of each hop, in order.
    pub pools: Vec<u32>,
}

impl Payload for CompositeSwap {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            swap: PoolSwap::decode(r)?,
            pools: r.read_vec(|r| r.read_varint())?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        self.swap.encode(w);
        w.write_vec(&self.pools, |w, id| w.write_varint(*id));
    }
}
