//! Token operations: `T` create, `N` update, `n` update-any, `M` mint.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DecodeResult;
use crate::reader::BufferReader;
use crate::types::{Payload, TokenBalance};
use crate::writer::BufferWriter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateToken {
    pub symbol: String,
    pub name: String,
    pub decimal: u8,
    pub limit: Decimal,
    pub is_dat: bool,
    pub tradeable: bool,
    pub mintable: bool,
}

impl Payload for CreateToken {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            symbol: r.read_string()?,
            name: r.read_string()?,
            decimal: r.read_u8()?,
            limit: r.read_amount()?,
            is_dat: r.read_bool()?,
            tradeable: r.read_bool()?,
            mintable: r.read_bool()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_string(&self.symbol);
        w.write_string(&self.name);
        w.write_u8(self.decimal);
        w.write_amount(&self.limit);
        w.write_bool(self.is_dat);
        w.write_bool(self.tradeable);
        w.write_bool(self.mintable);
    }
}

/// Flip the DAT flag of the token created by `creation_tx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateToken {
    pub creation_tx: String,
    pub is_dat: bool,
}

impl Payload for UpdateToken {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            creation_tx: r.read_hash()?,
            is_dat: r.read_bool()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.creation_tx);
        w.write_bool(self.is_dat);
    }
}

/// Replace every mutable attribute of the token created by `creation_tx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTokenAny {
    pub creation_tx: String,
    pub symbol: String,
    pub name: String,
    pub decimal: u8,
    pub limit: Decimal,
    pub is_dat: bool,
    pub tradeable: bool,
    pub mintable: bool,
}

impl Payload for UpdateTokenAny {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        let creation_tx = r.read_hash()?;
        let token = CreateToken::decode(r)?;
        Ok(Self {
            creation_tx,
            symbol: token.symbol,
            name: token.name,
            decimal: token.decimal,
            limit: token.limit,
            is_dat: token.is_dat,
            tradeable: token.tradeable,
            mintable: token.mintable,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.creation_tx);
        CreateToken {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            decimal: self.decimal,
            limit: self.limit,
            is_dat: self.is_dat,
            tradeable: self.tradeable,
            mintable: self.mintable,
        }
        .encode(w);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintToken {
    pub balances: Vec<TokenBalance>,
}

impl Payload for MintToken {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            balances: r.read_vec(TokenBalance::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_vec(&self.balances, |w, b| b.encode(w));
    }
}
