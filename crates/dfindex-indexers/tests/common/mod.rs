//! Chain harness shared by the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use dfindex_codec::DfTx;
use dfindex_core::{MainIndexer, Network, RawBlock, ScriptPubKey, Transaction, Vout};
use dfindex_indexers::default_indexers;
use dfindex_storage::{Key, MemoryDatabase, Model, ModelDatabase};

pub const GENESIS_TIME: i64 = 1_700_000_000;

pub type Snapshot = BTreeMap<Vec<u8>, Vec<u8>>;

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Deterministic 64-hex txid of transaction `n` in block `height`.
pub fn txid(height: u32, n: usize) -> String {
    format!("{:064x}", u64::from(height) * 1000 + n as u64)
}

pub fn script(n: u8) -> String {
    format!("0014{:040x}", n)
}

pub fn block_time(height: u32) -> i64 {
    GENESIS_TIME + i64::from(height) * 30
}

pub struct Chain {
    pub db: Arc<MemoryDatabase>,
    pub indexer: MainIndexer,
    /// Store contents before each indexed block, by height.
    pub before: Vec<Snapshot>,
}

impl Chain {
    /// Regtest chain with a history page size small enough to force paging.
    pub fn new() -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let indexer = MainIndexer::new(db.clone(), Network::Regtest, default_indexers())
            .with_history_page_size(2);
        Self {
            db,
            indexer,
            before: Vec::new(),
        }
    }

    pub fn height(&self) -> Option<u32> {
        self.before.len().checked_sub(1).map(|h| h as u32)
    }

    pub fn next_height(&self) -> u32 {
        self.before.len() as u32
    }

    /// The next block, holding one transaction per operation.
    pub fn block(&self, ops: Vec<DfTx>) -> RawBlock {
        let height = self.next_height();
        let tx = ops
            .into_iter()
            .enumerate()
            .map(|(n, dftx)| Transaction {
                txid: txid(height, n),
                vin: vec![],
                vout: vec![Vout {
                    value: Decimal::ZERO,
                    n: 0,
                    token_id: 0,
                    script_pub_key: ScriptPubKey {
                        hex: dftx.to_script_hex(),
                        asm: String::new(),
                        kind: "nulldata".into(),
                    },
                }],
            })
            .collect();
        RawBlock {
            hash: format!("block-{height}"),
            height,
            previous_hash: height.checked_sub(1).map(|h| format!("block-{h}")),
            time: block_time(height),
            median_time: block_time(height),
            tx,
        }
    }

    /// Index the next block and keep the store as it was before it.
    pub async fn mine(&mut self, ops: Vec<DfTx>) -> RawBlock {
        let block = self.block(ops);
        self.before.push(self.db.snapshot());
        self.indexer.index(&block).await.unwrap();
        block
    }

    pub async fn mine_empty(&mut self, count: usize) {
        for _ in 0..count {
            self.mine(vec![]).await;
        }
    }

    /// Invalidate the tip and check the store is back to its state before it.
    pub async fn undo(&mut self) {
        let expected = self.before.pop().expect("nothing to undo");
        let dropped = self.indexer.invalidate_tip().await.unwrap().unwrap();
        assert_eq!(dropped.height as usize, self.before.len());
        assert!(
            self.db.snapshot() == expected,
            "store differs after invalidating block {}",
            dropped.height
        );
    }

    pub fn get<M: Model>(&self, id: impl Into<Key>) -> Option<M> {
        self.db.get_model::<M>(&id.into()).unwrap()
    }
}
