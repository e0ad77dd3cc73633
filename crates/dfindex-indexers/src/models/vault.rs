//! Vaults and the bids placed on their auctions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dfindex_codec::TokenAmount;
use dfindex_storage::{Key, Model, ModelIndex};

use super::BlockRef;
use crate::history::Tracked;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    /// Creating transaction id.
    pub id: String,
    pub owner_script: String,
    pub scheme_id: String,
    pub collateral: Vec<TokenAmount>,
    pub loans: Vec<TokenAmount>,
    pub creation: BlockRef,
    pub block: BlockRef,
}

impl Vault {
    pub fn collateral_of(&self, token: u32) -> Decimal {
        amount_of(&self.collateral, token)
    }

    pub fn loan_of(&self, token: u32) -> Decimal {
        amount_of(&self.loans, token)
    }
}

fn amount_of(amounts: &[TokenAmount], token: u32) -> Decimal {
    amounts
        .iter()
        .find(|a| a.token == token)
        .map(|a| a.amount)
        .unwrap_or(Decimal::ZERO)
}

impl Model for Vault {
    const TYPE: &'static str = "vault";

    fn id(&self) -> Key {
        Key::Str(self.id.clone())
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::sorted(
            "owner",
            |v: &Self| Key::Str(v.owner_script.clone()),
            |v: &Self| Key::Str(v.id.clone()),
        )]
    }
}

impl Tracked for Vault {
    const HISTORY: &'static str = "vault_history";
}

/// A bid on one batch of a liquidation auction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultAuctionBid {
    pub vault_id: String,
    pub index: u32,
    pub from: String,
    pub amount: TokenAmount,
    pub txid: String,
    pub txn: u32,
    pub height: u32,
}

impl VaultAuctionBid {
    pub fn key(vault_id: &str, index: u32, height: u32, txn: u32) -> Key {
        Key::Tuple(vec![
            Key::Str(vault_id.to_string()),
            Key::U32(index),
            Key::U32(height),
            Key::U32(txn),
        ])
    }
}

impl Model for VaultAuctionBid {
    const TYPE: &'static str = "vault_auction_bid";

    fn id(&self) -> Key {
        Self::key(&self.vault_id, self.index, self.height, self.txn)
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::sorted(
            "batch",
            |b: &Self| Key::Tuple(vec![Key::Str(b.vault_id.clone()), Key::U32(b.index)]),
            |b: &Self| Key::Tuple(vec![Key::U32(b.height), Key::U32(b.txn)]),
        )]
    }
}
