//! Collateral tokens and loan tokens.

use async_trait::async_trait;

use dfindex_codec::ops::{SetCollateralToken, SetLoanToken, UpdateLoanToken};
use dfindex_codec::{opcodes, DfTx};
use dfindex_core::{DfTxOperation, IndexContext, Indexer, IndexerError, IndexerResult};
use dfindex_storage::{Database, Key, ModelDatabase};

use super::block_ref;
use super::token::next_token_id;
use crate::history::{self, HistoryEvent};
use crate::math::ZERO_AMOUNT;
use crate::models::{CollateralToken, LoanToken, Token};

fn loan_token_created_by(db: &dyn Database, txid: &str) -> IndexerResult<LoanToken> {
    db.get_by_index::<LoanToken>("creation_tx", &Key::from(txid), None)?
        .ok_or_else(|| IndexerError::not_found("LoanToken", format!("created by {txid}")))
}

pub struct LoanTokenIndexer;

impl LoanTokenIndexer {
    fn set_collateral(
        &self,
        ctx: &IndexContext<'_>,
        op: &DfTxOperation,
        data: &SetCollateralToken,
    ) -> IndexerResult<()> {
        if ctx.db.get_model::<Token>(&Key::U32(data.token))?.is_none() {
            return Err(IndexerError::not_found("Token", data.token));
        }
        let key = Key::U32(data.token);
        let event = match ctx.db.get_model::<CollateralToken>(&key)? {
            Some(_) => HistoryEvent::Update,
            None => HistoryEvent::Create,
        };
        let collateral = CollateralToken {
            token: data.token,
            factor: data.factor,
            currency_pair: data.currency_pair.clone(),
            activate_after_block: if data.activate_after_block == 0 {
                ctx.height()
            } else {
                data.activate_after_block
            },
            block: block_ref(ctx, op),
        };
        history::record(ctx, op, key, event, Some(collateral))
    }

    fn set_loan_token(
        &self,
        ctx: &IndexContext<'_>,
        op: &DfTxOperation,
        data: &SetLoanToken,
    ) -> IndexerResult<()> {
        let id = next_token_id(ctx.db, true)?;
        ctx.db.put_model(&Token {
            id,
            symbol: data.symbol.clone(),
            name: data.name.clone(),
            decimal: 8,
            limit: ZERO_AMOUNT,
            is_dat: true,
            is_lps: false,
            is_loan_token: true,
            tradeable: true,
            mintable: data.mintable,
            minted: ZERO_AMOUNT,
            creation: Some(block_ref(ctx, op)),
        })?;
        let loan_token = LoanToken {
            token: id,
            symbol: data.symbol.clone(),
            name: data.name.clone(),
            currency_pair: data.currency_pair.clone(),
            mintable: data.mintable,
            interest: data.interest,
            creation: block_ref(ctx, op),
            block: block_ref(ctx, op),
        };
        tracing::debug!(id, symbol = %data.symbol, "loan token created");
        history::record(ctx, op, Key::U32(id), HistoryEvent::Create, Some(loan_token))
    }

    fn update_loan_token(
        &self,
        ctx: &IndexContext<'_>,
        op: &DfTxOperation,
        data: &UpdateLoanToken,
    ) -> IndexerResult<()> {
        let mut loan_token = loan_token_created_by(ctx.db, &data.token_tx)?;
        loan_token.symbol = data.symbol.clone();
        loan_token.name = data.name.clone();
        loan_token.currency_pair = data.currency_pair.clone();
        loan_token.mintable = data.mintable;
        loan_token.interest = data.interest;
        loan_token.block = block_ref(ctx, op);
        history::record(
            ctx,
            op,
            Key::U32(loan_token.token),
            HistoryEvent::Update,
            Some(loan_token),
        )
    }
}

#[async_trait]
impl Indexer for LoanTokenIndexer {
    fn name(&self) -> &'static str {
        "loan_token"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[
            opcodes::SET_COLLATERAL_TOKEN,
            opcodes::SET_LOAN_TOKEN,
            opcodes::UPDATE_LOAN_TOKEN,
        ]
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::SetCollateralToken(data) => self.set_collateral(ctx, op, data)?,
                DfTx::SetLoanToken(data) => self.set_loan_token(ctx, op, data)?,
                DfTx::UpdateLoanToken(data) => self.update_loan_token(ctx, op, data)?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            match &op.dftx {
                DfTx::SetCollateralToken(data) => {
                    history::revert::<CollateralToken>(ctx, op, &Key::U32(data.token))?;
                }
                DfTx::SetLoanToken(_) => {
                    let id = loan_token_created_by(ctx.db, &op.txid)?.token;
                    history::revert::<LoanToken>(ctx, op, &Key::U32(id))?;
                    ctx.db.delete_model::<Token>(&Key::U32(id))?;
                }
                DfTx::UpdateLoanToken(data) => {
                    let id = loan_token_created_by(ctx.db, &data.token_tx)?.token;
                    history::revert::<LoanToken>(ctx, op, &Key::U32(id))?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}
