//! The `Model` contract and its key layout.
//!
//! A model is stored once in its primary keyspace (`TYPE ␟ ␟ id`) and once
//! more per declared index:
//!
//! ```text
//! unique index  TYPE ␟ name ␟ partition
//! sorted index  TYPE ␟ name ␟ len32(partition) partition sort
//! ```
//!
//! The length prefix isolates each `(model, index, partition)` triple into
//! its own sub-keyspace, so a range scan over one partition can never read
//! rows of a neighbouring partition.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::key::Key;

const SEP: u8 = 0x1F;

/// Extracts a key from an entity.
pub type KeyFn<M> = fn(&M) -> Key;

/// A named index declared by a model.
pub struct ModelIndex<M> {
    pub name: &'static str,
    pub partition: KeyFn<M>,
    /// `None`: one entity per partition. `Some`: partitions hold sorted sequences.
    pub sort: Option<KeyFn<M>>,
}

impl<M> ModelIndex<M> {
    pub fn unique(name: &'static str, partition: KeyFn<M>) -> Self {
        Self {
            name,
            partition,
            sort: None,
        }
    }

    pub fn sorted(name: &'static str, partition: KeyFn<M>, sort: KeyFn<M>) -> Self {
        Self {
            name,
            partition,
            sort: Some(sort),
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.sort.is_some()
    }
}

/// A persisted entity.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Keyspace name, unique per model type.
    const TYPE: &'static str;

    /// Primary key.
    fn id(&self) -> Key;

    /// Secondary indexes, each holding a denormalized copy of the entity.
    fn indexes() -> Vec<ModelIndex<Self>>;

    /// Look up a declared index by name.
    fn index(name: &str) -> Option<ModelIndex<Self>> {
        Self::indexes().into_iter().find(|index| index.name == name)
    }
}

/// Prefix of the primary keyspace of `M`.
pub(crate) fn primary_prefix<M: Model>() -> Vec<u8> {
    let mut out = Vec::with_capacity(M::TYPE.len() + 2);
    out.extend_from_slice(M::TYPE.as_bytes());
    out.push(SEP);
    out.push(SEP);
    out
}

pub(crate) fn primary_key<M: Model>(id: &Key) -> Vec<u8> {
    let mut out = primary_prefix::<M>();
    out.extend_from_slice(&id.encode());
    out
}

/// Prefix shared by every entry of one index.
pub(crate) fn index_prefix<M: Model>(index: &ModelIndex<M>) -> Vec<u8> {
    let mut out = Vec::with_capacity(M::TYPE.len() + index.name.len() + 2);
    out.extend_from_slice(M::TYPE.as_bytes());
    out.push(SEP);
    out.extend_from_slice(index.name.as_bytes());
    out.push(SEP);
    out
}

/// Prefix of one partition of a sorted index.
pub(crate) fn partition_prefix<M: Model>(index: &ModelIndex<M>, partition: &Key) -> Vec<u8> {
    let mut out = index_prefix(index);
    let encoded = partition.encode();
    out.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
    out.extend_from_slice(&encoded);
    out
}

/// Full storage key of `entity` within `index`.
pub(crate) fn index_key<M: Model>(index: &ModelIndex<M>, entity: &M) -> Vec<u8> {
    let partition = (index.partition)(entity);
    match index.sort {
        Some(sort) => {
            let mut out = partition_prefix(index, &partition);
            out.extend_from_slice(&sort(entity).encode());
            out
        }
        None => {
            let mut out = index_prefix(index);
            out.extend_from_slice(&partition.encode());
            out
        }
    }
}

/// The key a paginating caller receives as cursor for `entity` in `index`.
pub fn cursor_of<M: Model>(index: &ModelIndex<M>, entity: &M) -> Key {
    match index.sort {
        Some(sort) => sort(entity),
        None => (index.partition)(entity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize)]
    struct Swap {
        id: String,
        pool: String,
        height: u32,
    }

    impl Model for Swap {
        const TYPE: &'static str = "swap";

        fn id(&self) -> Key {
            Key::Str(self.id.clone())
        }

        fn indexes() -> Vec<ModelIndex<Self>> {
            vec![ModelIndex::sorted(
                "pool",
                |s: &Self| Key::Str(s.pool.clone()),
                |s: &Self| Key::U32(s.height),
            )]
        }
    }

    #[test]
    fn partitions_are_isolated_by_length_prefix() {
        let index = Swap::index("pool").unwrap();
        let a = Swap { id: "1".into(), pool: "1".into(), height: 5 };
        let b = Swap { id: "2".into(), pool: "12".into(), height: 5 };
        let prefix_a = partition_prefix(&index, &Key::Str("1".into()));
        assert!(index_key(&index, &a).starts_with(&prefix_a));
        assert!(!index_key(&index, &b).starts_with(&prefix_a));
    }

    #[test]
    fn primary_and_index_keyspaces_differ() {
        let index = Swap::index("pool").unwrap();
        let swap = Swap { id: "pool".into(), pool: "x".into(), height: 1 };
        assert!(!index_key(&index, &swap).starts_with(&primary_prefix::<Swap>()));
    }
}
