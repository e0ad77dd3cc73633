//! In-memory storage backend.
//!
//! A single sorted map of raw keys. Useful for tests and short-lived
//! indexers that don't need persistence; all data is lost on drop.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::database::{BatchOp, Database, Order, Scan, WriteBatch};
use crate::error::StorageResult;

/// In-memory [`Database`].
#[derive(Default)]
pub struct MemoryDatabase {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored key and value, for state comparisons.
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.data.read().clone()
    }

    /// Number of raw entries (primary rows plus index copies).
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Database for MemoryDatabase {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn scan(&self, scan: &Scan) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        if scan.is_empty_range() {
            return Ok(Vec::new());
        }
        let data = self.data.read();
        let range = data.range::<Vec<u8>, _>((scan.lower_bound(), scan.upper_bound()));
        let limit = scan.limit.unwrap_or(usize::MAX);
        let filtered = |(k, _): &(&Vec<u8>, &Vec<u8>)| k.starts_with(&scan.prefix);
        let rows = match scan.order {
            Order::Asc => range
                .filter(filtered)
                .take(limit)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Order::Desc => range
                .rev()
                .filter(filtered)
                .take(limit)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Ok(rows)
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut data = self.data.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put(key, value) => {
                    data.insert(key, value);
                }
                BatchOp::Delete(key) => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ModelDatabase, Query};
    use crate::key::Key;
    use crate::model::{Model, ModelIndex};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Feed {
        id: String,
        pair: String,
        height: u32,
        amount: String,
    }

    impl Model for Feed {
        const TYPE: &'static str = "feed";

        fn id(&self) -> Key {
            Key::Str(self.id.clone())
        }

        fn indexes() -> Vec<ModelIndex<Self>> {
            vec![
                ModelIndex::sorted(
                    "pair_height",
                    |f: &Self| Key::Str(f.pair.clone()),
                    |f: &Self| Key::U32(f.height),
                ),
                ModelIndex::unique("latest", |f: &Self| Key::Str(f.pair.clone())),
            ]
        }
    }

    fn feed(id: &str, pair: &str, height: u32) -> Feed {
        Feed {
            id: id.into(),
            pair: pair.into(),
            height,
            amount: "1.5".into(),
        }
    }

    fn seeded() -> MemoryDatabase {
        let db = MemoryDatabase::new();
        for (i, h) in [5u32, 300, 40, 2].iter().enumerate() {
            db.put_model(&feed(&format!("a{i}"), "DFI-USD", *h)).unwrap();
        }
        db.put_model(&feed("b0", "BTC-USD", 7)).unwrap();
        db
    }

    #[test]
    fn sorted_partition_queries_in_numeric_order() {
        let db = seeded();
        let asc: Vec<u32> = db
            .query::<Feed>("pair_height", &Query::partition("DFI-USD"))
            .unwrap()
            .iter()
            .map(|f| f.height)
            .collect();
        assert_eq!(asc, vec![2, 5, 40, 300]);

        let desc: Vec<u32> = db
            .query::<Feed>("pair_height", &Query::partition("DFI-USD").desc().limit(2))
            .unwrap()
            .iter()
            .map(|f| f.height)
            .collect();
        assert_eq!(desc, vec![300, 40]);
    }

    #[test]
    fn range_operators_bound_the_sort_key() {
        let db = seeded();
        let q = Query::partition("DFI-USD").gt(Key::U32(2)).lte(Key::U32(40));
        let heights: Vec<u32> = db
            .query::<Feed>("pair_height", &q)
            .unwrap()
            .iter()
            .map(|f| f.height)
            .collect();
        assert_eq!(heights, vec![5, 40]);
    }

    #[test]
    fn pagination_never_repeats_or_skips() {
        let db = seeded();
        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let query = Query::partition("DFI-USD").limit(2).after(cursor.take());
            let page = db.query_page::<Feed>("pair_height", &query).unwrap();
            if page.is_empty() {
                assert!(page.next.is_none());
                break;
            }
            seen.extend(page.items.iter().map(|f| f.height));
            cursor = page.next;
        }
        assert_eq!(seen, vec![2, 5, 40, 300]);
    }

    #[test]
    fn descending_pagination_uses_exclusive_upper_cursor() {
        let db = seeded();
        let first = db
            .query_page::<Feed>("pair_height", &Query::partition("DFI-USD").desc().limit(3))
            .unwrap();
        assert_eq!(first.next, Some(Key::U32(5)));
        let second = db
            .query_page::<Feed>(
                "pair_height",
                &Query::partition("DFI-USD").desc().limit(3).after(first.next),
            )
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].height, 2);
        assert!(second.next.is_none());
    }

    #[test]
    fn sorted_index_without_partition_fails_fast() {
        let db = seeded();
        let err = db.query::<Feed>("pair_height", &Query::new()).unwrap_err();
        assert!(matches!(err, crate::StorageError::PartitionRequired { .. }));
        let err = db.query::<Feed>("nope", &Query::new()).unwrap_err();
        assert!(matches!(err, crate::StorageError::UnknownIndex { .. }));
    }

    #[test]
    fn put_moves_stale_index_entries() {
        let db = MemoryDatabase::new();
        db.put_model(&feed("x", "DFI-USD", 1)).unwrap();
        db.put_model(&feed("x", "DFI-USD", 9)).unwrap();
        let rows = db
            .query::<Feed>("pair_height", &Query::partition("DFI-USD"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].height, 9);
        // primary + two index copies
        assert_eq!(db.len(), 3);
    }

    #[test]
    fn delete_removes_every_copy() {
        let db = seeded();
        let before = db.len();
        db.delete_model::<Feed>(&Key::Str("b0".into())).unwrap();
        assert_eq!(db.len(), before - 3);
        assert!(db
            .get_by_index::<Feed>("latest", &Key::Str("BTC-USD".into()), None)
            .unwrap()
            .is_none());
        // deleting again is a no-op
        db.delete_model::<Feed>(&Key::Str("b0".into())).unwrap();
    }

    #[test]
    fn unique_index_ranges_over_partitions() {
        let db = seeded();
        let pairs: Vec<String> = db
            .query::<Feed>("latest", &Query::new().desc())
            .unwrap()
            .into_iter()
            .map(|f| f.pair)
            .collect();
        assert_eq!(pairs, vec!["DFI-USD".to_string(), "BTC-USD".to_string()]);
    }
}
