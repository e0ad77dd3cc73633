//! The `Database` port and the typed model operations built on it.
//!
//! Backends implement three raw operations (`get`, `scan`, `write`). Every
//! model-level operation (`get`, `query`, `put`, `delete`) is provided once
//! by [`ModelDatabase`], so no call site ever writes an index by hand.

use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::key::{prefix_successor, Key};
use crate::model::{
    cursor_of, index_key, index_prefix, partition_prefix, primary_key, Model, ModelIndex,
};
use crate::page::Page;

/// Iteration order of a scan or query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// A raw range scan over full storage keys.
#[derive(Debug, Clone)]
pub struct Scan {
    /// Only keys starting with this prefix are returned.
    pub prefix: Vec<u8>,
    pub lower: Bound<Vec<u8>>,
    pub upper: Bound<Vec<u8>>,
    pub order: Order,
    pub limit: Option<usize>,
}

impl Scan {
    pub fn prefix(prefix: Vec<u8>) -> Self {
        Self {
            prefix,
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
            order: Order::Asc,
            limit: None,
        }
    }

    /// Effective lower bound, clamped to the prefix.
    pub fn lower_bound(&self) -> Bound<Vec<u8>> {
        match &self.lower {
            Bound::Unbounded => Bound::Included(self.prefix.clone()),
            bound => bound.clone(),
        }
    }

    /// Effective upper bound, clamped to the prefix.
    pub fn upper_bound(&self) -> Bound<Vec<u8>> {
        match &self.upper {
            Bound::Unbounded => match prefix_successor(&self.prefix) {
                Some(end) => Bound::Excluded(end),
                None => Bound::Unbounded,
            },
            bound => bound.clone(),
        }
    }

    /// `true` if `key` lies within prefix and bounds.
    pub fn contains(&self, key: &[u8]) -> bool {
        if !key.starts_with(&self.prefix) {
            return false;
        }
        let above_lower = match &self.lower {
            Bound::Included(lo) => key >= lo.as_slice(),
            Bound::Excluded(lo) => key > lo.as_slice(),
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Included(hi) => key <= hi.as_slice(),
            Bound::Excluded(hi) => key < hi.as_slice(),
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }

    /// `true` if no key can satisfy the bounds.
    pub fn is_empty_range(&self) -> bool {
        match (self.lower_bound(), self.upper_bound()) {
            (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
            (Bound::Included(lo), Bound::Excluded(hi))
            | (Bound::Excluded(lo), Bound::Included(hi))
            | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
            _ => false,
        }
    }
}

/// One raw mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// An ordered list of mutations applied atomically by [`Database::write`].
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put(key, value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete(key));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// The storage port.
///
/// Implementations: [`MemoryDatabase`](crate::memory::MemoryDatabase),
/// `RocksDatabase` (feature `rocksdb`) and
/// [`StagedDatabase`](crate::staged::StagedDatabase).
pub trait Database: Send + Sync {
    /// Point lookup. A missing key is `Ok(None)`.
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Ordered range scan returning `(key, value)` pairs.
    fn scan(&self, scan: &Scan) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply every mutation of `batch` atomically.
    fn write(&self, batch: WriteBatch) -> StorageResult<()>;
}

/// Parameters of an index query.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Required for sorted indexes; ignored by unique indexes.
    pub partition: Option<Key>,
    pub order: Order,
    pub limit: Option<usize>,
    pub gt: Option<Key>,
    pub gte: Option<Key>,
    pub lt: Option<Key>,
    pub lte: Option<Key>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition(key: impl Into<Key>) -> Self {
        Self {
            partition: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn desc(mut self) -> Self {
        self.order = Order::Desc;
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn gt(mut self, key: impl Into<Key>) -> Self {
        self.gt = Some(key.into());
        self
    }

    pub fn gte(mut self, key: impl Into<Key>) -> Self {
        self.gte = Some(key.into());
        self
    }

    pub fn lt(mut self, key: impl Into<Key>) -> Self {
        self.lt = Some(key.into());
        self
    }

    pub fn lte(mut self, key: impl Into<Key>) -> Self {
        self.lte = Some(key.into());
        self
    }

    /// Continue after `cursor` in the direction of this query.
    pub fn after(self, cursor: Option<Key>) -> Self {
        match (cursor, self.order) {
            (None, _) => self,
            (Some(key), Order::Asc) => self.gt(key),
            (Some(key), Order::Desc) => self.lt(key),
        }
    }

    fn to_scan(&self, prefix: Vec<u8>) -> Scan {
        let at = |key: &Key| {
            let mut full = prefix.clone();
            full.extend_from_slice(&key.encode());
            full
        };
        let lower = match (&self.gt, &self.gte) {
            (Some(gt), _) => Bound::Excluded(at(gt)),
            (None, Some(gte)) => Bound::Included(at(gte)),
            (None, None) => Bound::Unbounded,
        };
        let upper = match (&self.lt, &self.lte) {
            (Some(lt), _) => Bound::Excluded(at(lt)),
            (None, Some(lte)) => Bound::Included(at(lte)),
            (None, None) => Bound::Unbounded,
        };
        Scan {
            prefix,
            lower,
            upper,
            order: self.order,
            limit: self.limit,
        }
    }
}

/// Typed model operations, available on every [`Database`].
pub trait ModelDatabase {
    /// Fetch an entity by primary key.
    fn get_model<M: Model>(&self, id: &Key) -> StorageResult<Option<M>>;

    /// Fetch the denormalized copy stored in `index`.
    fn get_by_index<M: Model>(
        &self,
        index: &str,
        partition: &Key,
        sort: Option<&Key>,
    ) -> StorageResult<Option<M>>;

    /// Range query over one index.
    fn query<M: Model>(&self, index: &str, query: &Query) -> StorageResult<Vec<M>>;

    /// Range query returning a page with the cursor of its last item.
    fn query_page<M: Model>(&self, index: &str, query: &Query) -> StorageResult<Page<M>>;

    /// Insert or overwrite `entity` and every index copy of it.
    fn put_model<M: Model>(&self, entity: &M) -> StorageResult<()>;

    /// Remove the entity and every index copy of it. Missing ids are a no-op.
    fn delete_model<M: Model>(&self, id: &Key) -> StorageResult<()>;
}

fn lookup_index<M: Model>(name: &str) -> StorageResult<ModelIndex<M>> {
    M::index(name).ok_or_else(|| StorageError::UnknownIndex {
        model: M::TYPE,
        index: name.to_string(),
    })
}

fn encode<M: Model>(entity: &M) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(entity).map_err(|source| StorageError::Serialization {
        model: M::TYPE,
        source,
    })
}

fn decode<M: Model>(bytes: &[u8]) -> StorageResult<M> {
    serde_json::from_slice(bytes).map_err(|source| StorageError::Serialization {
        model: M::TYPE,
        source,
    })
}

impl<D: Database + ?Sized> ModelDatabase for D {
    fn get_model<M: Model>(&self, id: &Key) -> StorageResult<Option<M>> {
        self.get(&primary_key::<M>(id))?
            .map(|bytes| decode::<M>(&bytes))
            .transpose()
    }

    fn get_by_index<M: Model>(
        &self,
        index: &str,
        partition: &Key,
        sort: Option<&Key>,
    ) -> StorageResult<Option<M>> {
        let index = lookup_index::<M>(index)?;
        let key = match (index.is_sorted(), sort) {
            (true, Some(sort)) => {
                let mut key = partition_prefix(&index, partition);
                key.extend_from_slice(&sort.encode());
                key
            }
            (true, None) => {
                // First entry of the partition.
                let query = Query {
                    partition: Some(partition.clone()),
                    limit: Some(1),
                    ..Query::default()
                };
                return Ok(self.query::<M>(index.name, &query)?.into_iter().next());
            }
            (false, _) => {
                let mut key = index_prefix(&index);
                key.extend_from_slice(&partition.encode());
                key
            }
        };
        self.get(&key)?.map(|bytes| decode::<M>(&bytes)).transpose()
    }

    fn query<M: Model>(&self, index: &str, query: &Query) -> StorageResult<Vec<M>> {
        let index = lookup_index::<M>(index)?;
        let prefix = if index.is_sorted() {
            let partition = query
                .partition
                .as_ref()
                .ok_or_else(|| StorageError::PartitionRequired {
                    model: M::TYPE,
                    index: index.name.to_string(),
                })?;
            partition_prefix(&index, partition)
        } else {
            index_prefix(&index)
        };
        let scan = query.to_scan(prefix);
        if scan.is_empty_range() || query.limit == Some(0) {
            return Ok(Vec::new());
        }
        self.scan(&scan)?
            .into_iter()
            .map(|(_, value)| decode::<M>(&value))
            .collect()
    }

    fn query_page<M: Model>(&self, index: &str, query: &Query) -> StorageResult<Page<M>> {
        let items = self.query::<M>(index, query)?;
        let declared = lookup_index::<M>(index)?;
        let next = match (query.limit, items.last()) {
            (Some(limit), Some(last)) if items.len() == limit => Some(cursor_of(&declared, last)),
            _ => None,
        };
        Ok(Page { items, next })
    }

    fn put_model<M: Model>(&self, entity: &M) -> StorageResult<()> {
        let id = entity.id();
        let previous = self.get_model::<M>(&id)?;
        let value = encode(entity)?;

        let mut batch = WriteBatch::new();
        let indexes = M::indexes();
        if let Some(previous) = previous {
            for index in &indexes {
                let stale = index_key(index, &previous);
                if stale != index_key(index, entity) {
                    batch.delete(stale);
                }
            }
        }
        batch.put(primary_key::<M>(&id), value.clone());
        for index in &indexes {
            batch.put(index_key(index, entity), value.clone());
        }
        self.write(batch)
    }

    fn delete_model<M: Model>(&self, id: &Key) -> StorageResult<()> {
        let Some(previous) = self.get_model::<M>(id)? else {
            return Ok(());
        };
        let mut batch = WriteBatch::new();
        batch.delete(primary_key::<M>(id));
        for index in &M::indexes() {
            batch.delete(index_key(index, &previous));
        }
        self.write(batch)
    }
}
