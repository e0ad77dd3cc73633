//! Account operations: `U` utxos-to-account, `b` account-to-utxos,
//! `B` account-to-account, `a` any-accounts-to-accounts, and `G` governance.
//!
//! None of these feed a read model; they are decoded so scripts carrying
//! them are reported as recognized operations.

use serde::{Deserialize, Serialize};

use crate::error::DecodeResult;
use crate::reader::BufferReader;
use crate::types::{Payload, ScriptBalances, TokenBalance};
use crate::writer::BufferWriter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxosToAccount {
    pub to: Vec<ScriptBalances>,
}

impl Payload for UtxosToAccount {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            to: r.read_vec(ScriptBalances::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_vec(&self.to, |w, s| s.encode(w));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountToUtxos {
    pub from: String,
    pub balances: Vec<TokenBalance>,
    pub minting_outputs_start: u32,
}

impl Payload for AccountToUtxos {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            from: r.read_script()?,
            balances: r.read_vec(TokenBalance::decode)?,
            minting_outputs_start: r.read_u32()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_script(&self.from);
        w.write_vec(&self.balances, |w, b| b.encode(w));
        w.write_u32(self.minting_outputs_start);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountToAccount {
    pub from: String,
    pub to: Vec<ScriptBalances>,
}

impl Payload for AccountToAccount {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            from: r.read_script()?,
            to: r.read_vec(ScriptBalances::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_script(&self.from);
        w.write_vec(&self.to, |w, s| s.encode(w));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyAccountsToAccounts {
    pub from: Vec<ScriptBalances>,
    pub to: Vec<ScriptBalances>,
}

impl Payload for AnyAccountsToAccounts {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            from: r.read_vec(ScriptBalances::decode)?,
            to: r.read_vec(ScriptBalances::decode)?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_vec(&self.from, |w, s| s.encode(w));
        w.write_vec(&self.to, |w, s| s.encode(w));
    }
}

/// `G`: governance variables. The value layout depends on the variable
/// name, so the body is kept raw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetGovernance {
    /// First variable name, when present.
    pub key: Option<String>,
    /// Remaining payload after the name, hex.
    pub data: String,
}

impl Payload for SetGovernance {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        let key = if r.is_empty() { None } else { Some(r.read_string()?) };
        let rest = r.remaining();
        let data = hex::encode(r.read_bytes(rest)?);
        Ok(Self { key, data })
    }

    fn encode(&self, w: &mut BufferWriter) {
        if let Some(key) = &self.key {
            w.write_string(key);
        }
        w.write_bytes(&hex::decode(&self.data).unwrap_or_default());
    }
}
