//! Write staging for block-level atomicity.
//!
//! A `StagedDatabase` buffers every write of one block in an overlay.
//! Reads and scans see the overlay merged over the base store, so indexers
//! observe their own writes. `commit` publishes the whole block as a single
//! [`WriteBatch`]; dropping the stage discards it.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::database::{BatchOp, Database, Order, Scan, WriteBatch};
use crate::error::StorageResult;

/// Overlay over a base [`Database`]. `None` values are pending deletions.
pub struct StagedDatabase {
    base: Arc<dyn Database>,
    overlay: Mutex<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl StagedDatabase {
    pub fn new(base: Arc<dyn Database>) -> Self {
        Self {
            base,
            overlay: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of staged key mutations.
    pub fn pending(&self) -> usize {
        self.overlay.lock().len()
    }

    /// Publish all staged writes to the base store in one atomic batch.
    pub fn commit(self) -> StorageResult<usize> {
        let overlay = self.overlay.into_inner();
        let mut batch = WriteBatch::new();
        for (key, value) in overlay {
            match value {
                Some(value) => batch.put(key, value),
                None => batch.delete(key),
            }
        }
        let count = batch.len();
        self.base.write(batch)?;
        Ok(count)
    }
}

impl Database for StagedDatabase {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        if let Some(staged) = self.overlay.lock().get(key) {
            return Ok(staged.clone());
        }
        self.base.get(key)
    }

    fn scan(&self, scan: &Scan) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        if scan.is_empty_range() {
            return Ok(Vec::new());
        }
        let staged: Vec<(Vec<u8>, Option<Vec<u8>>)> = {
            let overlay = self.overlay.lock();
            overlay
                .range::<Vec<u8>, _>((scan.lower_bound(), scan.upper_bound()))
                .filter(|(k, _)| k.starts_with(&scan.prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        // Each staged key can hide at most one base row, so over-fetching by
        // the overlay size still yields `limit` surviving rows.
        let mut base_scan = scan.clone();
        base_scan.limit = scan.limit.map(|limit| limit.saturating_add(staged.len()));
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self.base.scan(&base_scan)?.into_iter().collect();
        for (key, value) in staged {
            match value {
                Some(value) => {
                    merged.insert(key, value);
                }
                None => {
                    merged.remove(&key);
                }
            }
        }

        let limit = scan.limit.unwrap_or(usize::MAX);
        let rows = match scan.order {
            Order::Asc => merged.into_iter().take(limit).collect(),
            Order::Desc => merged.into_iter().rev().take(limit).collect(),
        };
        Ok(rows)
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut overlay = self.overlay.lock();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put(key, value) => {
                    overlay.insert(key, Some(value));
                }
                BatchOp::Delete(key) => {
                    overlay.insert(key, None);
                }
            }
        }
        Ok(())
    }
}
