//! Token creation and minting.

use async_trait::async_trait;

use dfindex_codec::ops::{CreateToken, MintToken};
use dfindex_codec::{opcodes, DfTx};
use dfindex_core::{DfTxOperation, IndexContext, Indexer, IndexerError, IndexerResult};
use dfindex_storage::{Database, Key, ModelDatabase, Query};

use super::block_ref;
use crate::math::ZERO_AMOUNT;
use crate::models::token::{DCT_ID_START, DFI_ID};
use crate::models::Token;

/// Next free token id in the DAT or DCT range.
pub fn next_token_id(db: &dyn Database, is_dat: bool) -> IndexerResult<u32> {
    let query = if is_dat {
        Query::new().lt(DCT_ID_START)
    } else {
        Query::new().gte(DCT_ID_START)
    };
    let last = db
        .query::<Token>("id", &query.desc().limit(1))?
        .into_iter()
        .next();
    let next = match (last, is_dat) {
        (Some(token), _) => token.id + 1,
        (None, true) => DFI_ID + 1,
        (None, false) => DCT_ID_START,
    };
    if is_dat && next >= DCT_ID_START {
        return Err(IndexerError::Invariant("DAT token ids exhausted".into()));
    }
    Ok(next)
}

/// Token created by the transaction `txid`.
pub fn token_created_by(db: &dyn Database, txid: &str) -> IndexerResult<Token> {
    db.get_by_index::<Token>("creation_tx", &Key::from(txid), None)?
        .ok_or_else(|| IndexerError::not_found("Token", format!("created by {txid}")))
}

/// Token creation and minting. Seeds DFI at genesis.
pub struct TokenIndexer;

impl TokenIndexer {
    fn create(&self, ctx: &IndexContext<'_>, op: &DfTxOperation, data: &CreateToken) -> IndexerResult<()> {
        let id = next_token_id(ctx.db, data.is_dat)?;
        let token = Token {
            id,
            symbol: data.symbol.clone(),
            name: data.name.clone(),
            decimal: data.decimal,
            limit: data.limit,
            is_dat: data.is_dat,
            is_lps: false,
            is_loan_token: false,
            tradeable: data.tradeable,
            mintable: data.mintable,
            minted: ZERO_AMOUNT,
            creation: Some(block_ref(ctx, op)),
        };
        tracing::debug!(id, symbol = %token.display_symbol(), "token created");
        ctx.db.put_model(&token)?;
        Ok(())
    }

    fn mint(&self, ctx: &IndexContext<'_>, data: &MintToken, undo: bool) -> IndexerResult<()> {
        for balance in &data.balances {
            let mut token = ctx
                .db
                .get_model::<Token>(&Key::U32(balance.token))?
                .ok_or_else(|| IndexerError::not_found("Token", balance.token))?;
            if undo {
                if token.minted < balance.amount {
                    return Err(IndexerError::Invariant(format!(
                        "token {} minted {} is below the amount being reverted",
                        token.id, token.minted
                    )));
                }
                token.minted -= balance.amount;
            } else {
                token.minted += balance.amount;
            }
            ctx.db.put_model(&token)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Indexer for TokenIndexer {
    fn name(&self) -> &'static str {
        "token"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[opcodes::CREATE_TOKEN, opcodes::MINT_TOKEN]
    }

    async fn index_block_start(&self, ctx: &IndexContext<'_>) -> IndexerResult<()> {
        if ctx.height() == 0 {
            ctx.db.put_model(&Token::dfi())?;
        }
        Ok(())
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::CreateToken(data) => self.create(ctx, op, data)?,
                DfTx::MintToken(data) => self.mint(ctx, data, false)?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::CreateToken(_) => {
                    let token = token_created_by(ctx.db, &op.txid)?;
                    ctx.db.delete_model::<Token>(&Key::U32(token.id))?;
                }
                DfTx::MintToken(data) => self.mint(ctx, data, true)?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn invalidate_block_end(&self, ctx: &IndexContext<'_>) -> IndexerResult<()> {
        if ctx.height() == 0 {
            ctx.db.delete_model::<Token>(&Key::U32(DFI_ID))?;
        }
        Ok(())
    }
}
