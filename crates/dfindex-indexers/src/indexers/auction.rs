//! Auction bids on vaults in liquidation.

use async_trait::async_trait;

use dfindex_codec::{opcodes, DfTx};
use dfindex_core::{DfTxOperation, IndexContext, Indexer, IndexerError, IndexerResult};
use dfindex_storage::{Key, Model, ModelDatabase};

use super::vault::vault;
use crate::models::VaultAuctionBid;

/// Records bids placed on liquidation auctions.
pub struct AuctionIndexer;

#[async_trait]
impl Indexer for AuctionIndexer {
    fn name(&self) -> &'static str {
        "auction"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[opcodes::PLACE_AUCTION_BID]
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            let DfTx::PlaceAuctionBid(data) = &op.dftx else {
                continue;
            };
            vault(ctx.db, &data.vault_id)?;
            ctx.db.put_model(&VaultAuctionBid {
                vault_id: data.vault_id.clone(),
                index: data.index,
                from: data.from.clone(),
                amount: data.token_amount.clone(),
                txid: op.txid.clone(),
                txn: op.txn,
                height: ctx.height(),
            })?;
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            let DfTx::PlaceAuctionBid(data) = &op.dftx else {
                continue;
            };
            let key = VaultAuctionBid::key(&data.vault_id, data.index, ctx.height(), op.txn);
            if ctx.db.get_model::<VaultAuctionBid>(&key)?.is_none() {
                return Err(IndexerError::HistoryMissing {
                    model: VaultAuctionBid::TYPE,
                    id: key.to_string(),
                });
            }
            ctx.db.delete_model::<VaultAuctionBid>(&key)?;
        }
        Ok(())
    }
}
