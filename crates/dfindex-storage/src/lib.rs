//! dfindex-storage: model/index key-value storage for dfindex.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing, no persistence)
//! - `rocks`: RocksDB (feature `rocksdb`, single-directory persistence)
//! - [`staged`]: per-block write overlay committed atomically

pub mod database;
pub mod error;
pub mod key;
pub mod memory;
pub mod model;
pub mod page;
pub mod staged;

#[cfg(feature = "rocksdb")]
pub mod rocks;

pub use database::{BatchOp, Database, ModelDatabase, Order, Query, Scan, WriteBatch};
pub use error::{StorageError, StorageResult};
pub use key::Key;
pub use memory::MemoryDatabase;
pub use model::{cursor_of, Model, ModelIndex};
pub use page::Page;
pub use staged::StagedDatabase;

#[cfg(feature = "rocksdb")]
pub use rocks::RocksDatabase;
