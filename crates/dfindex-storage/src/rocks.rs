//! RocksDB storage backend.
//!
//! Keys are stored verbatim in the default column family; the order-preserving
//! key encoding makes RocksDB's bytewise comparator the index order.

use std::ops::Bound;
use std::path::Path;

use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options};

use crate::database::{BatchOp, Database, Order, Scan, WriteBatch};
use crate::error::StorageResult;

/// Persistent [`Database`] backed by a RocksDB directory.
pub struct RocksDatabase {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksDatabase {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let db = DBWithThreadMode::<MultiThreaded>::open(&options, path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "opened rocksdb store");
        Ok(Self { db })
    }
}

impl Database for RocksDatabase {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    fn scan(&self, scan: &Scan) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        if scan.is_empty_range() {
            return Ok(Vec::new());
        }
        let lower = scan.lower_bound();
        let upper = scan.upper_bound();
        let limit = scan.limit.unwrap_or(usize::MAX);

        let iter = match (scan.order, &lower, &upper) {
            (Order::Asc, Bound::Included(from) | Bound::Excluded(from), _) => self
                .db
                .iterator(IteratorMode::From(from.as_slice(), Direction::Forward)),
            (Order::Asc, Bound::Unbounded, _) => self.db.iterator(IteratorMode::Start),
            (Order::Desc, _, Bound::Included(from) | Bound::Excluded(from)) => self
                .db
                .iterator(IteratorMode::From(from.as_slice(), Direction::Reverse)),
            (Order::Desc, _, Bound::Unbounded) => self.db.iterator(IteratorMode::End),
        };

        let in_lower = |key: &[u8]| match &lower {
            Bound::Included(lo) => key >= lo.as_slice(),
            Bound::Excluded(lo) => key > lo.as_slice(),
            Bound::Unbounded => true,
        };
        let in_upper = |key: &[u8]| match &upper {
            Bound::Included(hi) => key <= hi.as_slice(),
            Bound::Excluded(hi) => key < hi.as_slice(),
            Bound::Unbounded => true,
        };

        let mut rows = Vec::new();
        for item in iter {
            if rows.len() >= limit {
                break;
            }
            let (key, value) = item?;
            let key: &[u8] = &key;
            let (past_end, before_start) = match scan.order {
                Order::Asc => (!in_upper(key), !in_lower(key)),
                Order::Desc => (!in_lower(key), !in_upper(key)),
            };
            if past_end {
                break;
            }
            if before_start || !key.starts_with(&scan.prefix) {
                continue;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }
        Ok(rows)
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put(key, value) => rocks_batch.put(key, value),
                BatchOp::Delete(key) => rocks_batch.delete(key),
            }
        }
        self.db.write(rocks_batch)?;
        Ok(())
    }
}
