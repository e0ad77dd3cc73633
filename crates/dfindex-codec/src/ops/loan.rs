//! Loan operations: `L` set scheme, `d` set default scheme, `D` destroy
//! scheme, `c` set collateral token, `g` set loan token, `x` update loan token.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DecodeResult;
use crate::reader::BufferReader;
use crate::types::{CurrencyPair, Payload};
use crate::writer::BufferWriter;

/// Activation marker meaning "apply at the block that carries the operation".
pub const ACTIVATE_NOW: u64 = u64::MAX;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLoanScheme {
    /// Minimum collateralization ratio, percent.
    pub ratio: u32,
    /// Annual interest rate, percent.
    pub rate: Decimal,
    pub identifier: String,
    /// Activation height; `0` or [`ACTIVATE_NOW`] apply immediately.
    pub update: u64,
}

impl Payload for SetLoanScheme {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            ratio: r.read_u32()?,
            rate: r.read_amount()?,
            identifier: r.read_string()?,
            update: r.read_u64()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_u32(self.ratio);
        w.write_amount(&self.rate);
        w.write_string(&self.identifier);
        w.write_u64(self.update);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDefaultLoanScheme {
    pub identifier: String,
}

impl Payload for SetDefaultLoanScheme {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            identifier: r.read_string()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_string(&self.identifier);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestroyLoanScheme {
    pub identifier: String,
    /// Destruction height; absent, `0` or [`ACTIVATE_NOW`] destroy immediately.
    pub height: u64,
}

impl Payload for DestroyLoanScheme {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        let identifier = r.read_string()?;
        let height = if r.remaining() >= 8 { r.read_u64()? } else { 0 };
        Ok(Self { identifier, height })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_string(&self.identifier);
        w.write_u64(self.height);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCollateralToken {
    pub token: u32,
    pub factor: Decimal,
    pub currency_pair: CurrencyPair,
    /// `0` means the current block.
    pub activate_after_block: u32,
}

impl Payload for SetCollateralToken {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            token: r.read_varint()?,
            factor: r.read_amount()?,
            currency_pair: CurrencyPair::decode(r)?,
            activate_after_block: r.read_u32()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_varint(self.token);
        w.write_amount(&self.factor);
        self.currency_pair.encode(w);
        w.write_u32(self.activate_after_block);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLoanToken {
    pub symbol: String,
    pub name: String,
    pub currency_pair: CurrencyPair,
    pub mintable: bool,
    pub interest: Decimal,
}

impl Payload for SetLoanToken {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            symbol: r.read_string()?,
            name: r.read_string()?,
            currency_pair: CurrencyPair::decode(r)?,
            mintable: r.read_bool()?,
            interest: r.read_amount()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_string(&self.symbol);
        w.write_string(&self.name);
        self.currency_pair.encode(w);
        w.write_bool(self.mintable);
        w.write_amount(&self.interest);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateLoanToken {
    pub symbol: String,
    pub name: String,
    pub currency_pair: CurrencyPair,
    pub mintable: bool,
    pub interest: Decimal,
    /// Creation txid of the loan token.
    pub token_tx: String,
}

impl Payload for UpdateLoanToken {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        let token = SetLoanToken::decode(r)?;
        Ok(Self {
            symbol: token.symbol,
            name: token.name,
            currency_pair: token.currency_pair,
            mintable: token.mintable,
            interest: token.interest,
            token_tx: r.read_hash()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        SetLoanToken {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            currency_pair: self.currency_pair.clone(),
            mintable: self.mintable,
            interest: self.interest,
        }
        .encode(w);
        w.write_hash(&self.token_tx);
    }
}
