//! Append-only history of latest views.
//!
//! Every operation that changes a latest view appends one `History<T>` row
//! holding the view as it stands after the operation (`None` once the
//! entity is gone). Invalidation deletes that row and rebuilds the view from
//! the newest remaining row that is in effect.
//!
//! Rows are kept in two sorted indexes of the entity's partition:
//!
//! ```text
//! entity     (height, txn)               listing order
//! effective  (activation, height, txn)   order in which rows took effect
//! ```
//!
//! A deferred row is appended at submission but only takes effect once the
//! sweep marks it `applied`, so its effective position is its activation
//! height rather than its submission height.

use serde::{Deserialize, Serialize};

use dfindex_core::{DfTxOperation, IndexContext, IndexerError, IndexerResult};
use dfindex_storage::{Database, Key, Model, ModelDatabase, ModelIndex, Query};

use crate::models::{CollateralToken, DefaultLoanScheme, LoanScheme, LoanToken, Oracle, PoolPair, Vault};

/// A latest view whose changes are recorded in a `History<Self>` keyspace.
///
/// The view's primary key is the history partition.
pub trait Tracked: Model + Clone {
    /// Keyspace of the history rows.
    const HISTORY: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEvent {
    Create,
    Update,
    Destroy,
    AddLiquidity,
    RemoveLiquidity,
    Deposit,
    Withdraw,
    TakeLoan,
    PaybackLoan,
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History<T> {
    pub entity: Key,
    pub height: u32,
    /// Index of the originating transaction in its block.
    pub txn: u32,
    pub txid: String,
    pub event: HistoryEvent,
    /// Height at which `snapshot` became (or becomes) the latest view.
    pub activation_height: u32,
    /// `false` while a deferred row waits for its activation height.
    pub applied: bool,
    pub snapshot: Option<T>,
}

pub type LoanSchemeHistory = History<LoanScheme>;
pub type DefaultLoanSchemeHistory = History<DefaultLoanScheme>;
pub type VaultHistory = History<Vault>;
pub type LoanTokenHistory = History<LoanToken>;
pub type CollateralTokenHistory = History<CollateralToken>;
pub type PoolPairHistory = History<PoolPair>;
pub type OracleHistory = History<Oracle>;

impl<T: Tracked> History<T> {
    /// An immediately applied row for `op` in the current block.
    pub fn applied(
        ctx: &IndexContext<'_>,
        op: &DfTxOperation,
        entity: Key,
        event: HistoryEvent,
        snapshot: Option<T>,
    ) -> Self {
        Self {
            entity,
            height: ctx.height(),
            txn: op.txn,
            txid: op.txid.clone(),
            event,
            activation_height: ctx.height(),
            applied: true,
            snapshot,
        }
    }

    pub fn key(entity: &Key, height: u32, txn: u32) -> Key {
        Key::Tuple(vec![entity.clone(), Key::U32(height), Key::U32(txn)])
    }
}

impl<T: Tracked> Model for History<T> {
    const TYPE: &'static str = T::HISTORY;

    fn id(&self) -> Key {
        Self::key(&self.entity, self.height, self.txn)
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![
            ModelIndex::sorted(
                "entity",
                |h: &Self| h.entity.clone(),
                |h: &Self| Key::Tuple(vec![Key::U32(h.height), Key::U32(h.txn)]),
            ),
            ModelIndex::sorted(
                "effective",
                |h: &Self| h.entity.clone(),
                |h: &Self| {
                    Key::Tuple(vec![
                        Key::U32(h.activation_height),
                        Key::U32(h.height),
                        Key::U32(h.txn),
                    ])
                },
            ),
        ]
    }
}

/// Write `snapshot` as the latest view of `entity`, or delete the view.
pub fn apply_view<T: Tracked>(
    db: &dyn Database,
    entity: &Key,
    snapshot: Option<&T>,
) -> IndexerResult<()> {
    match snapshot {
        Some(view) => db.put_model(view)?,
        None => db.delete_model::<T>(entity)?,
    }
    Ok(())
}

/// Append an applied row for `op` and make `snapshot` the latest view.
pub fn record<T: Tracked>(
    ctx: &IndexContext<'_>,
    op: &DfTxOperation,
    entity: Key,
    event: HistoryEvent,
    snapshot: Option<T>,
) -> IndexerResult<()> {
    apply_view(ctx.db, &entity, snapshot.as_ref())?;
    ctx.db
        .put_model(&History::applied(ctx, op, entity, event, snapshot))?;
    Ok(())
}

/// Undo [`record`]: drop the row of `op` and restore the view from the rows
/// that remain. Returns the restored view.
pub fn revert<T: Tracked>(
    ctx: &IndexContext<'_>,
    op: &DfTxOperation,
    entity: &Key,
) -> IndexerResult<Option<T>> {
    remove::<T>(ctx.db, entity, ctx.height(), op.txn)?;
    restore::<T>(ctx, entity, ctx.height())
}

/// Delete one history row. A missing row means history is corrupt.
pub fn remove<T: Tracked>(
    db: &dyn Database,
    entity: &Key,
    height: u32,
    txn: u32,
) -> IndexerResult<()> {
    let key = History::<T>::key(entity, height, txn);
    if db.get_model::<History<T>>(&key)?.is_none() {
        return Err(missing::<T>(&key));
    }
    db.delete_model::<History<T>>(&key)?;
    Ok(())
}

/// Flip the `applied` flag of one history row.
pub fn set_applied<T: Tracked>(
    db: &dyn Database,
    entity: &Key,
    height: u32,
    txn: u32,
    applied: bool,
) -> IndexerResult<()> {
    let key = History::<T>::key(entity, height, txn);
    let mut row = db
        .get_model::<History<T>>(&key)?
        .ok_or_else(|| missing::<T>(&key))?;
    row.applied = applied;
    db.put_model(&row)?;
    Ok(())
}

/// Newest applied row of `entity` whose activation height is `<= at_height`,
/// scanning the effective order backwards one page at a time.
pub fn latest_in_effect<T: Tracked>(
    db: &dyn Database,
    entity: &Key,
    at_height: u32,
    page_size: usize,
) -> IndexerResult<Option<History<T>>> {
    let mut cursor = None;
    loop {
        let query = Query::partition(entity.clone())
            .desc()
            .limit(page_size.max(1))
            .after(cursor);
        let page = db.query_page::<History<T>>("effective", &query)?;
        if let Some(row) = page
            .items
            .into_iter()
            .find(|row| row.applied && row.activation_height <= at_height)
        {
            return Ok(Some(row));
        }
        match page.next {
            Some(next) => cursor = Some(next),
            None => return Ok(None),
        }
    }
}

/// Rebuild the latest view of `entity` from its history. With no row in
/// effect the view is deleted.
pub fn restore<T: Tracked>(
    ctx: &IndexContext<'_>,
    entity: &Key,
    at_height: u32,
) -> IndexerResult<Option<T>> {
    let snapshot = latest_in_effect::<T>(ctx.db, entity, at_height, ctx.history_page_size)?
        .and_then(|row| row.snapshot);
    apply_view(ctx.db, entity, snapshot.as_ref())?;
    tracing::trace!(model = T::TYPE, %entity, found = snapshot.is_some(), "restored view");
    Ok(snapshot)
}

/// Every row of `entity` in listing order.
pub fn list<T: Tracked>(db: &dyn Database, entity: &Key) -> IndexerResult<Vec<History<T>>> {
    Ok(db.query::<History<T>>("entity", &Query::partition(entity.clone()))?)
}

fn missing<T: Tracked>(key: &Key) -> IndexerError {
    IndexerError::HistoryMissing {
        model: T::HISTORY,
        id: key.to_string(),
    }
}
