//! The `Payload` contract and the composite values shared by many operations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DecodeResult;
use crate::reader::BufferReader;
use crate::writer::BufferWriter;

/// A typed binary payload.
pub trait Payload: Sized {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self>;
    fn encode(&self, w: &mut BufferWriter);
}

/// Token amount with a fixed-width (`u32`) token id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub token: u32,
    pub amount: Decimal,
}

impl Payload for TokenBalance {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            token: r.read_u32()?,
            amount: r.read_amount()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_u32(self.token);
        w.write_amount(&self.amount);
    }
}

/// Token amount with a `VARINT` token id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: u32,
    pub amount: Decimal,
}

impl Payload for TokenAmount {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            token: r.read_varint()?,
            amount: r.read_amount()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_varint(self.token);
        w.write_amount(&self.amount);
    }
}

/// Balances credited to or debited from one script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptBalances {
    pub script: String,
    pub balances: Vec<TokenBalance>,
}

impl Payload for ScriptBalances {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            script: r.read_script()?,
            balances: r.read_vec(TokenBalance::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_script(&self.script);
        w.write_vec(&self.balances, |w, b| b.encode(w));
    }
}

/// Oracle price pair, e.g. `TSLA` / `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub token: String,
    pub currency: String,
}

impl CurrencyPair {
    pub fn new(token: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            currency: currency.into(),
        }
    }

    /// `TOKEN-CURRENCY`, for display only: a dash inside either half makes it
    /// ambiguous.
    pub fn symbol(&self) -> String {
        format!("{}-{}", self.token, self.currency)
    }
}

impl Payload for CurrencyPair {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            token: r.read_string()?,
            currency: r.read_string()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_string(&self.token);
        w.write_string(&self.currency);
    }
}

/// One currency quote inside a [`TokenPrice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub currency: String,
    pub amount: Decimal,
}

impl Payload for CurrencyAmount {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            currency: r.read_string()?,
            amount: r.read_amount()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_string(&self.currency);
        w.write_amount(&self.amount);
    }
}

/// Quotes of one token in several currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPrice {
    pub token: String,
    pub prices: Vec<CurrencyAmount>,
}

impl Payload for TokenPrice {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            token: r.read_string()?,
            prices: r.read_vec(CurrencyAmount::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_string(&self.token);
        w.write_vec(&self.prices, |w, p| p.encode(w));
    }
}
