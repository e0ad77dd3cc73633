//! Deferred activation: changes submitted at one height that take effect at
//! a later, already known height.
//!
//! ```text
//! submit      activation <= height ── history row (applied) + latest view
//!                                  └─ history row (pending) + deferred record
//! activate    block start: pending records with activation <= height are
//!             flagged, their history rows marked applied, views rebuilt
//! deactivate  block end of invalidate: records flagged at this height go
//!             back to pending, views rebuilt
//! withdraw    invalidate of the submitting operation
//! ```
//!
//! Views are always rebuilt from history (see [`crate::history`]), so when
//! several records of one entity activate at the same height the last one in
//! `(activation, height, txn)` order wins.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use dfindex_core::{DfTxOperation, IndexContext, IndexerResult};
use dfindex_storage::{Database, Key, Model, ModelDatabase, Query};

use crate::history::{self, History, HistoryEvent, Tracked};

/// Fields shared by every deferred record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredMeta {
    pub entity: Key,
    pub activation_height: u32,
    /// Submission height.
    pub height: u32,
    pub txn: u32,
    pub txid: String,
    /// Height of the sweep that applied this record.
    pub activated_height: Option<u32>,
}

impl DeferredMeta {
    /// Metadata for `op` submitted in the current block. An activation
    /// height not above the current height applies immediately.
    pub fn new(
        ctx: &IndexContext<'_>,
        op: &DfTxOperation,
        entity: Key,
        activation_height: u32,
    ) -> Self {
        Self {
            entity,
            activation_height,
            height: ctx.height(),
            txn: op.txn,
            txid: op.txid.clone(),
            activated_height: None,
        }
    }

    pub fn key(&self) -> Key {
        Key::Tuple(vec![
            self.entity.clone(),
            Key::U32(self.activation_height),
            Key::U32(self.height),
            Key::U32(self.txn),
        ])
    }

    pub fn is_activated(&self) -> bool {
        self.activated_height.is_some()
    }

    /// Partition of the `state` index.
    pub fn state(&self) -> Key {
        match self.activated_height {
            None => Self::pending(),
            Some(height) => Self::activated_at(height),
        }
    }

    /// Sort key of the `state` index.
    pub fn sort(&self) -> Key {
        Key::Tuple(vec![
            Key::U32(self.activation_height),
            Key::U32(self.height),
            Key::U32(self.txn),
            self.entity.clone(),
        ])
    }

    pub fn pending() -> Key {
        Key::Str("pending".into())
    }

    pub fn activated_at(height: u32) -> Key {
        Key::Tuple(vec![Key::Str("activated".into()), Key::U32(height)])
    }
}

/// A record the engine can schedule. Implementors declare a sorted `state`
/// index over [`DeferredMeta::state`] / [`DeferredMeta::sort`].
pub trait DeferredRecord: Model + Clone {
    /// The latest view this record changes.
    type Target: Tracked;

    /// Event written to the target's history at submission.
    const EVENT: HistoryEvent;

    fn meta(&self) -> &DeferredMeta;

    fn meta_mut(&mut self) -> &mut DeferredMeta;

    /// The view once applied; `None` deletes it.
    fn target(&self) -> Option<Self::Target>;
}

/// Outcome of [`DeferredEngine::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Applied,
    Deferred { activation_height: u32 },
}

pub struct DeferredEngine<D> {
    _record: PhantomData<fn() -> D>,
}

impl<D> Default for DeferredEngine<D> {
    fn default() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<D: DeferredRecord> DeferredEngine<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submission; applies it now when its activation height is
    /// already reached.
    pub fn submit(&self, ctx: &IndexContext<'_>, record: D) -> IndexerResult<Submission> {
        let meta = record.meta().clone();
        let snapshot = record.target();
        let immediate = meta.activation_height <= ctx.height();

        ctx.db.put_model(&History {
            entity: meta.entity.clone(),
            height: meta.height,
            txn: meta.txn,
            txid: meta.txid.clone(),
            event: D::EVENT,
            activation_height: if immediate {
                ctx.height()
            } else {
                meta.activation_height
            },
            applied: immediate,
            snapshot: snapshot.clone(),
        })?;

        if immediate {
            history::apply_view(ctx.db, &meta.entity, snapshot.as_ref())?;
            return Ok(Submission::Applied);
        }
        ctx.db.put_model(&record)?;
        tracing::debug!(
            model = D::TYPE,
            entity = %meta.entity,
            activation = meta.activation_height,
            "deferred"
        );
        Ok(Submission::Deferred {
            activation_height: meta.activation_height,
        })
    }

    /// Undo the submission described by `meta`.
    pub fn withdraw(&self, ctx: &IndexContext<'_>, meta: &DeferredMeta) -> IndexerResult<()> {
        ctx.db.delete_model::<D>(&meta.key())?;
        history::remove::<D::Target>(ctx.db, &meta.entity, meta.height, meta.txn)?;
        self.restore(ctx, &meta.entity, ctx.height())?;
        Ok(())
    }

    /// Block-start sweep: apply every pending record due at this height.
    /// Returns the number of records activated.
    pub fn activate(&self, ctx: &IndexContext<'_>) -> IndexerResult<usize> {
        let height = ctx.height();
        let due = collect::<D>(
            ctx.db,
            Query::partition(DeferredMeta::pending())
                .lt(Key::Tuple(vec![Key::U32(height.saturating_add(1))])),
            ctx.history_page_size,
        )?;
        if due.is_empty() {
            return Ok(0);
        }

        let mut entities: Vec<Key> = Vec::new();
        for mut record in due.iter().cloned() {
            let meta = record.meta_mut();
            meta.activated_height = Some(height);
            let (entity, submitted, txn) = (meta.entity.clone(), meta.height, meta.txn);
            ctx.db.put_model(&record)?;
            history::set_applied::<D::Target>(ctx.db, &entity, submitted, txn, true)?;
            if !entities.contains(&entity) {
                entities.push(entity);
            }
        }
        for entity in &entities {
            self.restore(ctx, entity, height)?;
        }

        tracing::info!(model = D::TYPE, height, records = due.len(), "activated deferred records");
        Ok(due.len())
    }

    /// Mirror of [`activate`](Self::activate) for the block being invalidated.
    pub fn deactivate(&self, ctx: &IndexContext<'_>) -> IndexerResult<usize> {
        let height = ctx.height();
        let swept = collect::<D>(
            ctx.db,
            Query::partition(DeferredMeta::activated_at(height)),
            ctx.history_page_size,
        )?;

        let mut entities: Vec<Key> = Vec::new();
        for mut record in swept.iter().cloned() {
            let meta = record.meta_mut();
            meta.activated_height = None;
            let (entity, submitted, txn) = (meta.entity.clone(), meta.height, meta.txn);
            ctx.db.put_model(&record)?;
            history::set_applied::<D::Target>(ctx.db, &entity, submitted, txn, false)?;
            if !entities.contains(&entity) {
                entities.push(entity);
            }
        }
        for entity in &entities {
            self.restore(ctx, entity, height)?;
        }

        if !swept.is_empty() {
            tracing::info!(model = D::TYPE, height, records = swept.len(), "deactivated deferred records");
        }
        Ok(swept.len())
    }

    /// Rebuild the latest view of `entity` as of `height`.
    pub fn restore(
        &self,
        ctx: &IndexContext<'_>,
        entity: &Key,
        height: u32,
    ) -> IndexerResult<Option<D::Target>> {
        history::restore::<D::Target>(ctx, entity, height)
    }

    /// Records still waiting for activation, in activation order.
    pub fn pending(&self, db: &dyn Database) -> IndexerResult<Vec<D>> {
        Ok(db.query::<D>("state", &Query::partition(DeferredMeta::pending()))?)
    }
}

/// Drain a query page by page before the caller starts moving rows between
/// partitions.
fn collect<D: DeferredRecord>(
    db: &dyn Database,
    query: Query,
    page_size: usize,
) -> IndexerResult<Vec<D>> {
    let mut rows = Vec::new();
    let mut cursor = None;
    loop {
        let page = db.query_page::<D>(
            "state",
            &query.clone().limit(page_size.max(1)).after(cursor),
        )?;
        rows.extend(page.items);
        match page.next {
            Some(next) => cursor = Some(next),
            None => return Ok(rows),
        }
    }
}
