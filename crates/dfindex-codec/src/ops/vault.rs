//! Vault operations: `V` create, `v` update, `e` close, `S` deposit,
//! `J` withdraw, `X` take loan, `H` payback, `I` auction bid.

use serde::{Deserialize, Serialize};

use crate::error::DecodeResult;
use crate::reader::BufferReader;
use crate::types::{Payload, TokenAmount, TokenBalance};
use crate::writer::BufferWriter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateVault {
    pub owner_address: String,
    /// Empty selects the default loan scheme.
    pub scheme_id: String,
}

impl Payload for CreateVault {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            owner_address: r.read_script()?,
            scheme_id: r.read_string()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_script(&self.owner_address);
        w.write_string(&self.scheme_id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateVault {
    pub vault_id: String,
    pub owner_address: String,
    pub scheme_id: String,
}

impl Payload for UpdateVault {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            vault_id: r.read_hash()?,
            owner_address: r.read_script()?,
            scheme_id: r.read_string()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.vault_id);
        w.write_script(&self.owner_address);
        w.write_string(&self.scheme_id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseVault {
    pub vault_id: String,
    pub to: String,
}

impl Payload for CloseVault {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            vault_id: r.read_hash()?,
            to: r.read_script()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.vault_id);
        w.write_script(&self.to);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositToVault {
    pub vault_id: String,
    pub from: String,
    pub token_amount: TokenAmount,
}

impl Payload for DepositToVault {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            vault_id: r.read_hash()?,
            from: r.read_script()?,
            token_amount: TokenAmount::decode(r)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.vault_id);
        w.write_script(&self.from);
        self.token_amount.encode(w);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawFromVault {
    pub vault_id: String,
    pub to: String,
    pub token_amount: TokenAmount,
}

impl Payload for WithdrawFromVault {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            vault_id: r.read_hash()?,
            to: r.read_script()?,
            token_amount: TokenAmount::decode(r)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.vault_id);
        w.write_script(&self.to);
        self.token_amount.encode(w);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeLoan {
    pub vault_id: String,
    pub to: String,
    pub token_amounts: Vec<TokenBalance>,
}

impl Payload for TakeLoan {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            vault_id: r.read_hash()?,
            to: r.read_script()?,
            token_amounts: r.read_vec(TokenBalance::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.vault_id);
        w.write_script(&self.to);
        w.write_vec(&self.token_amounts, |w, b| b.encode(w));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaybackLoan {
    pub vault_id: String,
    pub from: String,
    pub token_amounts: Vec<TokenBalance>,
}

impl Payload for PaybackLoan {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            vault_id: r.read_hash()?,
            from: r.read_script()?,
            token_amounts: r.read_vec(TokenBalance::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.vault_id);
        w.write_script(&self.from);
        w.write_vec(&self.token_amounts, |w, b| b.encode(w));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceAuctionBid {
    pub vault_id: String,
    /// Batch index within the auction.
    pub index: u32,
    pub from: String,
    pub token_amount: TokenAmount,
}

impl Payload for PlaceAuctionBid {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            vault_id: r.read_hash()?,
            index: r.read_u32()?,
            from: r.read_script()?,
            token_amount: TokenAmount::decode(r)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.vault_id);
        w.write_u32(self.index);
        w.write_script(&self.from);
        self.token_amount.encode(w);
    }
}
