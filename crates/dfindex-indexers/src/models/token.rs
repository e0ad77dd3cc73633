//! Tokens: DFI, DATs, DCTs and pool shares.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dfindex_storage::{Key, Model, ModelIndex};

use super::BlockRef;
use crate::math::ZERO_AMOUNT;

/// Id of DFI. Reserved even when genesis was never indexed.
pub const DFI_ID: u32 = 0;

/// Ids below this bound belong to DATs (foundation-issued tokens, pool shares
/// and loan tokens); user-created DCTs are numbered from it upward.
pub const DCT_ID_START: u32 = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: u32,
    pub symbol: String,
    pub name: String,
    pub decimal: u8,
    pub limit: Decimal,
    pub is_dat: bool,
    pub is_lps: bool,
    pub is_loan_token: bool,
    pub tradeable: bool,
    pub mintable: bool,
    pub minted: Decimal,
    /// `None` for the genesis DFI token.
    pub creation: Option<BlockRef>,
}

impl Token {
    /// The native token, present from genesis.
    pub fn dfi() -> Self {
        Self {
            id: DFI_ID,
            symbol: "DFI".into(),
            name: "Default Defi token".into(),
            decimal: 8,
            limit: ZERO_AMOUNT,
            is_dat: true,
            is_lps: false,
            is_loan_token: false,
            tradeable: true,
            mintable: false,
            minted: ZERO_AMOUNT,
            creation: None,
        }
    }

    /// Symbol as shown to users: DCTs carry their id as suffix.
    pub fn display_symbol(&self) -> String {
        if self.is_dat {
            self.symbol.clone()
        } else {
            format!("{}#{}", self.symbol, self.id)
        }
    }
}

impl Model for Token {
    const TYPE: &'static str = "token";

    fn id(&self) -> Key {
        Key::U32(self.id)
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![
            ModelIndex::unique("id", |t: &Self| Key::U32(t.id)),
            ModelIndex::unique("creation_tx", |t: &Self| {
                Key::Str(t.creation.as_ref().map(|c| c.txid.clone()).unwrap_or_default())
            }),
        ]
    }
}
