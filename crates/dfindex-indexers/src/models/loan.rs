//! Loan schemes, collateral and loan tokens.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dfindex_codec::CurrencyPair;
use dfindex_storage::{Key, Model, ModelIndex};

use super::BlockRef;
use crate::deferred::{DeferredMeta, DeferredRecord};
use crate::history::{HistoryEvent, Tracked};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanScheme {
    pub id: String,
    /// Minimum collateralization ratio, in percent.
    pub ratio: u32,
    /// Annual interest rate, in percent.
    pub rate: Decimal,
    /// Height at which this version took effect.
    pub activation_height: u32,
    pub block: BlockRef,
}

impl Model for LoanScheme {
    const TYPE: &'static str = "loan_scheme";

    fn id(&self) -> Key {
        Key::Str(self.id.clone())
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::unique("id", |s: &Self| Key::Str(s.id.clone()))]
    }
}

impl Tracked for LoanScheme {
    const HISTORY: &'static str = "loan_scheme_history";
}

/// Pointer to the scheme vaults use when they name none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultLoanScheme {
    pub scheme_id: String,
    pub block: BlockRef,
}

impl DefaultLoanScheme {
    pub fn key() -> Key {
        Key::Str("default".into())
    }
}

impl Model for DefaultLoanScheme {
    const TYPE: &'static str = "default_loan_scheme";

    fn id(&self) -> Key {
        Self::key()
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![]
    }
}

impl Tracked for DefaultLoanScheme {
    const HISTORY: &'static str = "default_loan_scheme_history";
}

/// A scheme update waiting for its activation height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredLoanScheme {
    #[serde(flatten)]
    pub meta: DeferredMeta,
    pub scheme: LoanScheme,
}

impl Model for DeferredLoanScheme {
    const TYPE: &'static str = "deferred_loan_scheme";

    fn id(&self) -> Key {
        self.meta.key()
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::sorted(
            "state",
            |d: &Self| d.meta.state(),
            |d: &Self| d.meta.sort(),
        )]
    }
}

impl DeferredRecord for DeferredLoanScheme {
    type Target = LoanScheme;
    const EVENT: HistoryEvent = HistoryEvent::Update;

    fn meta(&self) -> &DeferredMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DeferredMeta {
        &mut self.meta
    }

    fn target(&self) -> Option<LoanScheme> {
        Some(self.scheme.clone())
    }
}

/// A scheme destruction waiting for its activation height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredDestroyLoanScheme {
    #[serde(flatten)]
    pub meta: DeferredMeta,
}

impl Model for DeferredDestroyLoanScheme {
    const TYPE: &'static str = "deferred_destroy_loan_scheme";

    fn id(&self) -> Key {
        self.meta.key()
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::sorted(
            "state",
            |d: &Self| d.meta.state(),
            |d: &Self| d.meta.sort(),
        )]
    }
}

impl DeferredRecord for DeferredDestroyLoanScheme {
    type Target = LoanScheme;
    const EVENT: HistoryEvent = HistoryEvent::Destroy;

    fn meta(&self) -> &DeferredMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DeferredMeta {
        &mut self.meta
    }

    fn target(&self) -> Option<LoanScheme> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollateralToken {
    pub token: u32,
    pub factor: Decimal,
    pub currency_pair: CurrencyPair,
    /// Height from which the token counts as collateral.
    pub activate_after_block: u32,
    pub block: BlockRef,
}

impl Model for CollateralToken {
    const TYPE: &'static str = "collateral_token";

    fn id(&self) -> Key {
        Key::U32(self.token)
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::unique("token", |c: &Self| Key::U32(c.token))]
    }
}

impl Tracked for CollateralToken {
    const HISTORY: &'static str = "collateral_token_history";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanToken {
    pub token: u32,
    pub symbol: String,
    pub name: String,
    pub currency_pair: CurrencyPair,
    pub mintable: bool,
    pub interest: Decimal,
    pub creation: BlockRef,
    pub block: BlockRef,
}

impl Model for LoanToken {
    const TYPE: &'static str = "loan_token";

    fn id(&self) -> Key {
        Key::U32(self.token)
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![
            ModelIndex::unique("token", |l: &Self| Key::U32(l.token)),
            ModelIndex::unique("creation_tx", |l: &Self| Key::Str(l.creation.txid.clone())),
        ]
    }
}

impl Tracked for LoanToken {
    const HISTORY: &'static str = "loan_token_history";
}
