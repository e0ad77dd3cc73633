//! Masternode registration and resignation.

use async_trait::async_trait;

use dfindex_codec::{opcodes, DfTx};
use dfindex_core::{DfTxOperation, IndexContext, Indexer, IndexerError, IndexerResult};
use dfindex_storage::{Key, ModelDatabase};

use super::block_ref;
use crate::models::Masternode;

pub struct MasternodeIndexer;

fn masternode(ctx: &IndexContext<'_>, id: &str) -> IndexerResult<Masternode> {
    ctx.db
        .get_model::<Masternode>(&Key::from(id))?
        .ok_or_else(|| IndexerError::not_found("Masternode", id))
}

#[async_trait]
impl Indexer for MasternodeIndexer {
    fn name(&self) -> &'static str {
        "masternode"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[opcodes::CREATE_MASTERNODE, opcodes::RESIGN_MASTERNODE]
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::CreateMasternode(data) => {
                    ctx.db.put_model(&Masternode {
                        id: op.txid.clone(),
                        operator_type: data.operator_type,
                        operator_pub_key_hash: data.operator_pub_key_hash.clone(),
                        timelock: data.timelock,
                        creation: block_ref(ctx, op),
                        resign: None,
                    })?;
                }
                DfTx::ResignMasternode(data) => {
                    let mut node = masternode(ctx, &data.node_id)?;
                    if node.resign.is_some() {
                        return Err(IndexerError::Invariant(format!(
                            "masternode {} resigned twice",
                            node.id
                        )));
                    }
                    node.resign = Some(block_ref(ctx, op));
                    ctx.db.put_model(&node)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::CreateMasternode(_) => {
                    ctx.db.delete_model::<Masternode>(&Key::from(&op.txid))?;
                }
                DfTx::ResignMasternode(data) => {
                    let mut node = masternode(ctx, &data.node_id)?;
                    match &node.resign {
                        Some(resign) if resign.txid == op.txid => node.resign = None,
                        _ => {
                            return Err(IndexerError::HistoryMissing {
                                model: "Masternode",
                                id: node.id,
                            })
                        }
                    }
                    ctx.db.put_model(&node)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}
