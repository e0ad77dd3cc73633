//! Oracle operations: `o` appoint, `t` update, `h` remove, `y` set data.

use serde::{Deserialize, Serialize};

use crate::error::DecodeResult;
use crate::reader::BufferReader;
use crate::types::{CurrencyPair, Payload, TokenPrice};
use crate::writer::BufferWriter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointOracle {
    pub script: String,
    pub weightage: u8,
    pub price_feeds: Vec<CurrencyPair>,
}

impl Payload for AppointOracle {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            script: r.read_script()?,
            weightage: r.read_u8()?,
            price_feeds: r.read_vec(CurrencyPair::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_script(&self.script);
        w.write_u8(self.weightage);
        w.write_vec(&self.price_feeds, |w, p| p.encode(w));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOracle {
    pub oracle_id: String,
    pub script: String,
    pub weightage: u8,
    pub price_feeds: Vec<CurrencyPair>,
}

impl Payload for UpdateOracle {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            oracle_id: r.read_hash()?,
            script: r.read_script()?,
            weightage: r.read_u8()?,
            price_feeds: r.read_vec(CurrencyPair::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.oracle_id);
        w.write_script(&self.script);
        w.write_u8(self.weightage);
        w.write_vec(&self.price_feeds, |w, p| p.encode(w));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveOracle {
    pub oracle_id: String,
}

impl Payload for RemoveOracle {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            oracle_id: r.read_hash()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.oracle_id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOracleData {
    pub oracle_id: String,
    /// Unix seconds claimed by the oracle.
    pub timestamp: i64,
    pub token_prices: Vec<TokenPrice>,
}

impl Payload for SetOracleData {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            oracle_id: r.read_hash()?,
            timestamp: r.read_i64()?,
            token_prices: r.read_vec(TokenPrice::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.oracle_id);
        w.write_i64(self.timestamp);
        w.write_vec(&self.token_prices, |w, p| p.encode(w));
    }
}
