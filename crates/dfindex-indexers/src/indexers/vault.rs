//! Vault lifecycle: creation, updates, collateral, loans and closing.

use async_trait::async_trait;
use rust_decimal::Decimal;

use dfindex_codec::{opcodes, DfTx, TokenAmount};
use dfindex_core::{DfTxOperation, IndexContext, Indexer, IndexerError, IndexerResult};
use dfindex_storage::{Database, Key, ModelDatabase};

use super::block_ref;
use crate::history::{self, HistoryEvent};
use crate::models::{DefaultLoanScheme, LoanScheme, Token, Vault};

pub fn vault(db: &dyn Database, id: &str) -> IndexerResult<Vault> {
    db.get_model::<Vault>(&Key::from(id))?
        .ok_or_else(|| IndexerError::not_found("Vault", id))
}

/// The named scheme, or the default one for an empty name.
fn resolve_scheme(db: &dyn Database, scheme_id: &str) -> IndexerResult<String> {
    if scheme_id.is_empty() {
        let default = db
            .get_model::<DefaultLoanScheme>(&DefaultLoanScheme::key())?
            .ok_or_else(|| IndexerError::not_found("DefaultLoanScheme", "default"))?;
        return Ok(default.scheme_id);
    }
    if db.get_model::<LoanScheme>(&Key::from(scheme_id))?.is_none() {
        return Err(IndexerError::not_found("LoanScheme", scheme_id));
    }
    Ok(scheme_id.to_string())
}

fn credit(amounts: &mut Vec<TokenAmount>, token: u32, amount: Decimal) {
    match amounts.iter_mut().find(|a| a.token == token) {
        Some(entry) => entry.amount += amount,
        None => amounts.push(TokenAmount { token, amount }),
    }
}

/// Subtract up to `amount`; entries reaching zero are dropped.
fn debit(amounts: &mut Vec<TokenAmount>, token: u32, amount: Decimal, clamp: bool) -> IndexerResult<()> {
    let Some(position) = amounts.iter().position(|a| a.token == token) else {
        return if clamp {
            Ok(())
        } else {
            Err(IndexerError::Invariant(format!("vault holds no token {token}")))
        };
    };
    let entry = &mut amounts[position];
    if entry.amount < amount && !clamp {
        return Err(IndexerError::Invariant(format!(
            "vault holds {} of token {token}, cannot take {amount}",
            entry.amount
        )));
    }
    let taken = amount.min(entry.amount);
    entry.amount -= taken;
    if entry.amount.is_zero() {
        amounts.remove(position);
    }
    Ok(())
}

fn ensure_token(db: &dyn Database, token: u32) -> IndexerResult<()> {
    match db.get_model::<Token>(&Key::U32(token))? {
        Some(_) => Ok(()),
        None => Err(IndexerError::not_found("Token", token)),
    }
}

pub struct VaultIndexer;

impl VaultIndexer {
    fn apply(&self, ctx: &IndexContext<'_>, op: &DfTxOperation) -> IndexerResult<()> {
        let Some(id) = vault_id(op) else {
            return Ok(());
        };
        let (event, snapshot) = match &op.dftx {
            DfTx::CreateVault(data) => {
                let vault = Vault {
                    id: op.txid.clone(),
                    owner_script: data.owner_address.clone(),
                    scheme_id: resolve_scheme(ctx.db, &data.scheme_id)?,
                    collateral: Vec::new(),
                    loans: Vec::new(),
                    creation: block_ref(ctx, op),
                    block: block_ref(ctx, op),
                };
                (HistoryEvent::Create, Some(vault))
            }
            DfTx::UpdateVault(data) => {
                let mut vault = vault(ctx.db, &data.vault_id)?;
                vault.owner_script = data.owner_address.clone();
                vault.scheme_id = resolve_scheme(ctx.db, &data.scheme_id)?;
                vault.block = block_ref(ctx, op);
                (HistoryEvent::Update, Some(vault))
            }
            DfTx::DepositToVault(data) => {
                ensure_token(ctx.db, data.token_amount.token)?;
                let mut vault = vault(ctx.db, &data.vault_id)?;
                credit(&mut vault.collateral, data.token_amount.token, data.token_amount.amount);
                vault.block = block_ref(ctx, op);
                (HistoryEvent::Deposit, Some(vault))
            }
            DfTx::WithdrawFromVault(data) => {
                let mut vault = vault(ctx.db, &data.vault_id)?;
                debit(&mut vault.collateral, data.token_amount.token, data.token_amount.amount, false)?;
                vault.block = block_ref(ctx, op);
                (HistoryEvent::Withdraw, Some(vault))
            }
            DfTx::TakeLoan(data) => {
                let mut vault = vault(ctx.db, &data.vault_id)?;
                for balance in &data.token_amounts {
                    ensure_token(ctx.db, balance.token)?;
                    credit(&mut vault.loans, balance.token, balance.amount);
                }
                vault.block = block_ref(ctx, op);
                (HistoryEvent::TakeLoan, Some(vault))
            }
            DfTx::PaybackLoan(data) => {
                let mut vault = vault(ctx.db, &data.vault_id)?;
                // overpayment (interest included) settles the whole loan
                for balance in &data.token_amounts {
                    debit(&mut vault.loans, balance.token, balance.amount, true)?;
                }
                vault.block = block_ref(ctx, op);
                (HistoryEvent::PaybackLoan, Some(vault))
            }
            DfTx::CloseVault(data) => {
                let vault = vault(ctx.db, &data.vault_id)?;
                if !vault.loans.is_empty() {
                    return Err(IndexerError::Invariant(format!(
                        "vault {} closed with outstanding loans",
                        vault.id
                    )));
                }
                (HistoryEvent::Close, None)
            }
            _ => return Ok(()),
        };
        history::record(ctx, op, Key::Str(id), event, snapshot)
    }
}

fn vault_id(op: &DfTxOperation) -> Option<String> {
    Some(match &op.dftx {
        DfTx::CreateVault(_) => op.txid.clone(),
        DfTx::UpdateVault(data) => data.vault_id.clone(),
        DfTx::DepositToVault(data) => data.vault_id.clone(),
        DfTx::WithdrawFromVault(data) => data.vault_id.clone(),
        DfTx::TakeLoan(data) => data.vault_id.clone(),
        DfTx::PaybackLoan(data) => data.vault_id.clone(),
        DfTx::CloseVault(data) => data.vault_id.clone(),
        _ => return None,
    })
}

#[async_trait]
impl Indexer for VaultIndexer {
    fn name(&self) -> &'static str {
        "vault"
    }

    fn opcodes(&self) -> &'static [u8] {
        &[
            opcodes::CREATE_VAULT,
            opcodes::UPDATE_VAULT,
            opcodes::DEPOSIT_TO_VAULT,
            opcodes::WITHDRAW_FROM_VAULT,
            opcodes::TAKE_LOAN,
            opcodes::PAYBACK_LOAN,
            opcodes::CLOSE_VAULT,
        ]
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            self.apply(ctx, op)?;
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            if let Some(id) = vault_id(op) {
                history::revert::<Vault>(ctx, op, &Key::Str(id))?;
            }
        }
        Ok(())
    }
}
