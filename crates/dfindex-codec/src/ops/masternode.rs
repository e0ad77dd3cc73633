//! Masternode operations: `C` create, `R` resign.

use serde::{Deserialize, Serialize};

use crate::error::DecodeResult;
use crate::reader::BufferReader;
use crate::types::Payload;
use crate::writer::BufferWriter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMasternode {
    /// 1 = P2PKH, 4 = P2WPKH.
    pub operator_type: u8,
    /// 20-byte key hash, hex.
    pub operator_pub_key_hash: String,
    /// Lock period in years, absent on pre-timelock masternodes.
    pub timelock: Option<u16>,
}

impl Payload for CreateMasternode {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        let operator_type = r.read_u8()?;
        let operator_pub_key_hash = hex::encode(r.read_bytes(20)?);
        let timelock = if r.remaining() >= 2 {
            Some(r.read_u16()?)
        } else {
            None
        };
        Ok(Self {
            operator_type,
            operator_pub_key_hash,
            timelock,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_u8(self.operator_type);
        let mut hash = hex::decode(&self.operator_pub_key_hash).unwrap_or_default();
        hash.resize(20, 0);
        w.write_bytes(&hash);
        if let Some(timelock) = self.timelock {
            w.write_u16(timelock);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResignMasternode {
    pub node_id: String,
}

impl Payload for ResignMasternode {
    fn decode(r: &mut BufferReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            node_id: r.read_hash()?,
        })
    }

    fn encode(&self, w: &mut BufferWriter) {
        w.write_hash(&self.node_id);
    }
}
