//! Masternodes.

use serde::{Deserialize, Serialize};

use dfindex_storage::{Key, Model, ModelIndex};

use super::BlockRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Masternode {
    /// Creating transaction id.
    pub id: String,
    pub operator_type: u8,
    pub operator_pub_key_hash: String,
    /// Timelock in weeks, if any.
    pub timelock: Option<u16>,
    pub creation: BlockRef,
    pub resign: Option<BlockRef>,
}

impl Model for Masternode {
    const TYPE: &'static str = "masternode";

    fn id(&self) -> Key {
        Key::Str(self.id.clone())
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::sorted(
            "height",
            |_: &Self| Key::Str("masternodes".into()),
            |m: &Self| Key::Tuple(vec![Key::U32(m.creation.height), Key::Str(m.id.clone())]),
        )]
    }
}
