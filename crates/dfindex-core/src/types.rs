//! Block shapes as returned by the node's `getblock` (verbosity 2).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dfindex_storage::{Key, Model, ModelIndex};

// ─── Raw block ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptPubKey {
    pub hex: String,
    #[serde(default)]
    pub asm: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vout {
    pub value: Decimal,
    pub n: u32,
    #[serde(rename = "tokenId", default)]
    pub token_id: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vin {
    /// Set on the coinbase input only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vout: Option<u32>,
    #[serde(default)]
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: String,
    #[serde(default)]
    pub vin: Vec<Vin>,
    #[serde(default)]
    pub vout: Vec<Vout>,
}

impl Transaction {
    /// Script of the output that may carry a DfTx marker.
    pub fn marker_script(&self) -> Option<&str> {
        self.vout.first().map(|v| v.script_pub_key.hex.as_str())
    }
}

/// Immutable block snapshot; the source every derived record is built from.
///
/// Persisted on index so `invalidate` can replay exactly what was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub hash: String,
    pub height: u32,
    #[serde(rename = "previousblockhash", default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    pub time: i64,
    #[serde(rename = "mediantime")]
    pub median_time: i64,
    #[serde(default)]
    pub tx: Vec<Transaction>,
}

impl Model for RawBlock {
    const TYPE: &'static str = "raw_block";

    fn id(&self) -> Key {
        Key::Str(self.hash.clone())
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::unique("height", |b: &Self| Key::U32(b.height))]
    }
}

// ─── Block summary ───────────────────────────────────────────────────────────

/// Per-height summary row; the highest one is the indexer tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    pub height: u32,
    pub previous_hash: Option<String>,
    pub time: i64,
    pub median_time: i64,
    pub transaction_count: u32,
}

impl Block {
    /// Returns `true` if `block` is the direct child of `self`.
    pub fn is_parent_of(&self, block: &RawBlock) -> bool {
        block.height == self.height + 1 && block.previous_hash.as_deref() == Some(self.hash.as_str())
    }
}

impl From<&RawBlock> for Block {
    fn from(raw: &RawBlock) -> Self {
        Self {
            hash: raw.hash.clone(),
            height: raw.height,
            previous_hash: raw.previous_hash.clone(),
            time: raw.time,
            median_time: raw.median_time,
            transaction_count: raw.tx.len() as u32,
        }
    }
}

impl Model for Block {
    const TYPE: &'static str = "block";

    fn id(&self) -> Key {
        Key::Str(self.hash.clone())
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::unique("height", |b: &Self| Key::U32(b.height))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_JSON: &str = r#"{
        "hash": "bb",
        "height": 2,
        "previousblockhash": "aa",
        "time": 1700000100,
        "mediantime": 1700000000,
        "tx": [{
            "txid": "t1",
            "vin": [{"coinbase": "0201", "sequence": 4294967295}],
            "vout": [{
                "value": 0.5,
                "n": 0,
                "tokenId": 0,
                "scriptPubKey": {"hex": "6a00", "asm": "OP_RETURN 0", "type": "nulldata"}
            }]
        }]
    }"#;

    #[test]
    fn parses_node_block_json() {
        let block: RawBlock = serde_json::from_str(NODE_JSON).unwrap();
        assert_eq!(block.previous_hash.as_deref(), Some("aa"));
        assert_eq!(block.median_time, 1_700_000_000);
        assert_eq!(block.tx[0].vin[0].coinbase.as_deref(), Some("0201"));
        assert_eq!(block.tx[0].vout[0].script_pub_key.kind, "nulldata");
        assert_eq!(block.tx[0].marker_script(), Some("6a00"));
        assert_eq!(block.tx[0].vout[0].value, Decimal::new(5, 1));
    }

    #[test]
    fn summary_links_to_child() {
        let child: RawBlock = serde_json::from_str(NODE_JSON).unwrap();
        let parent = Block {
            hash: "aa".into(),
            height: 1,
            previous_hash: None,
            time: 0,
            median_time: 0,
            transaction_count: 0,
        };
        assert!(parent.is_parent_of(&child));
        assert_eq!(Block::from(&child).transaction_count, 1);
    }
}
