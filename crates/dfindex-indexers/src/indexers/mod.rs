//! One indexer per operation family. A family shares one indexer so that
//! its operations are applied in transaction order within a block.

pub mod auction;
pub mod loan_scheme;
pub mod loan_token;
pub mod masternode;
pub mod oracle;
pub mod pool;
pub mod price;
pub mod swap;
pub mod token;
pub mod vault;

use dfindex_core::{DfTxOperation, IndexContext};

use crate::models::BlockRef;

pub(crate) fn block_ref(ctx: &IndexContext<'_>, op: &DfTxOperation) -> BlockRef {
    BlockRef {
        height: ctx.height(),
        txid: op.txid.clone(),
    }
}
