//! Dispatcher and sync-loop integration tests with scripted indexers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dfindex_codec::ops::{DestroyLoanScheme, SetDefaultLoanScheme};
use dfindex_codec::{opcodes, DfTx};
use dfindex_core::{
    BlockSource, DfTxOperation, IndexContext, IndexLoop, Indexer, IndexerBuilder, IndexerError,
    IndexerResult, MainIndexer, MemoryBlockSource, Network, RawBlock, ScriptPubKey, SyncOutcome,
    Transaction, Vout,
};
use dfindex_storage::{Database, Key, MemoryDatabase, Model, ModelDatabase, ModelIndex};

// ─── Helpers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    txid: String,
    height: u32,
}

impl Model for Note {
    const TYPE: &'static str = "note";

    fn id(&self) -> Key {
        Key::Str(self.txid.clone())
    }

    fn indexes() -> Vec<ModelIndex<Self>> {
        vec![ModelIndex::unique("height", |n: &Self| Key::U32(n.height))]
    }
}

/// Records every hook call and writes one `Note` per owned operation.
struct Recorder {
    name: &'static str,
    opcodes: &'static [u8],
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(format!("{}:{entry}", self.name));
    }
}

#[async_trait]
impl Indexer for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn opcodes(&self) -> &'static [u8] {
        self.opcodes
    }

    async fn index_block_start(&self, ctx: &IndexContext<'_>) -> IndexerResult<()> {
        self.push(format!("start@{}", ctx.height()));
        Ok(())
    }

    async fn index(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            if op.dftx.opcode() == opcodes::DESTROY_LOAN_SCHEME {
                return Err(IndexerError::Invariant("scripted failure".into()));
            }
            self.push(format!("index {}", op.txid));
            ctx.db.put_model(&Note {
                txid: op.txid.clone(),
                height: ctx.height(),
            })?;
        }
        Ok(())
    }

    async fn invalidate(&self, ctx: &IndexContext<'_>, ops: &[DfTxOperation]) -> IndexerResult<()> {
        for op in ops {
            self.push(format!("invalidate {}", op.txid));
            ctx.db.delete_model::<Note>(&Key::from(&op.txid))?;
        }
        Ok(())
    }

    async fn invalidate_block_end(&self, ctx: &IndexContext<'_>) -> IndexerResult<()> {
        self.push(format!("end@{}", ctx.height()));
        Ok(())
    }
}

fn tx(txid: &str, dftx: Option<DfTx>) -> Transaction {
    let hex = dftx.map(|d| d.to_script_hex()).unwrap_or_else(|| "0014ab".into());
    Transaction {
        txid: txid.into(),
        vin: vec![],
        vout: vec![Vout {
            value: Decimal::ZERO,
            n: 0,
            token_id: 0,
            script_pub_key: ScriptPubKey {
                hex,
                asm: String::new(),
                kind: String::new(),
            },
        }],
    }
}

fn default_scheme(id: &str) -> Option<DfTx> {
    Some(DfTx::SetDefaultLoanScheme(SetDefaultLoanScheme {
        identifier: id.into(),
    }))
}

fn block(height: u32, hash: &str, prev: Option<&str>, tx: Vec<Transaction>) -> RawBlock {
    RawBlock {
        hash: hash.into(),
        height,
        previous_hash: prev.map(Into::into),
        time: 1_700_000_000 + i64::from(height) * 30,
        median_time: 1_700_000_000 + i64::from(height) * 30,
        tx,
    }
}

fn setup() -> (Arc<MemoryDatabase>, MainIndexer, Arc<Mutex<Vec<String>>>) {
    let db = Arc::new(MemoryDatabase::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let indexers: Vec<Arc<dyn Indexer>> = vec![
        Arc::new(Recorder {
            name: "a",
            opcodes: &[opcodes::SET_DEFAULT_LOAN_SCHEME],
            log: log.clone(),
        }),
        Arc::new(Recorder {
            name: "b",
            opcodes: &[opcodes::DESTROY_LOAN_SCHEME],
            log: log.clone(),
        }),
    ];
    let indexer = MainIndexer::new(db.clone(), Network::Regtest, indexers);
    (db, indexer, log)
}

// ─── MainIndexer ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn hooks_run_in_order_with_filtered_operations() {
    let (_db, indexer, log) = setup();
    let b0 = block(0, "h0", None, vec![tx("t1", default_scheme("A")), tx("t2", None)]);
    indexer.index(&b0).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["a:start@0", "a:index t1", "b:start@0"]
    );
    assert_eq!(indexer.tip().unwrap().unwrap().hash, "h0");
}

#[tokio::test]
async fn invalidate_restores_the_exact_previous_state() {
    let (db, indexer, log) = setup();
    let b0 = block(0, "h0", None, vec![]);
    let b1 = block(
        1,
        "h1",
        Some("h0"),
        vec![tx("t1", default_scheme("A")), tx("t2", default_scheme("B"))],
    );
    indexer.index(&b0).await.unwrap();
    let before = db.snapshot();

    indexer.index(&b1).await.unwrap();
    assert!(db.get_model::<Note>(&Key::from("t2")).unwrap().is_some());

    log.lock().unwrap().clear();
    let dropped = indexer.invalidate_tip().await.unwrap().unwrap();
    assert_eq!(dropped.hash, "h1");
    assert_eq!(db.snapshot(), before);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["a:invalidate t2", "a:invalidate t1", "a:end@1", "b:end@1"]
    );
}

#[tokio::test]
async fn failing_indexer_discards_the_whole_block() {
    let (db, indexer, _log) = setup();
    indexer.index(&block(0, "h0", None, vec![])).await.unwrap();
    let before = db.snapshot();

    let destroy = Some(DfTx::DestroyLoanScheme(DestroyLoanScheme {
        identifier: "A".into(),
        height: 0,
    }));
    let b1 = block(
        1,
        "h1",
        Some("h0"),
        vec![tx("t1", default_scheme("A")), tx("t2", destroy)],
    );
    let err = indexer.index(&b1).await.unwrap_err();
    assert!(matches!(err, IndexerError::Invariant(_)));
    assert_eq!(db.snapshot(), before);
    assert_eq!(indexer.tip().unwrap().unwrap().height, 0);
}

#[tokio::test]
async fn blocks_must_extend_the_tip() {
    let (_db, indexer, _log) = setup();
    indexer.index(&block(0, "h0", None, vec![])).await.unwrap();
    let orphan = block(1, "h1", Some("other"), vec![]);
    assert!(matches!(
        indexer.index(&orphan).await.unwrap_err(),
        IndexerError::Discontinuity { .. }
    ));
    let gap = block(2, "h2", Some("h0"), vec![]);
    assert!(indexer.index(&gap).await.is_err());
}

#[tokio::test]
async fn malformed_known_operation_is_a_decode_error() {
    let (_db, indexer, _log) = setup();
    let mut bad = tx("bad", None);
    // OP_RETURN, DfTx, 'L' with a truncated payload
    bad.vout[0].script_pub_key.hex = "6a07446654784c9600".to_string();
    let err = indexer.index(&block(0, "h0", None, vec![bad])).await.unwrap_err();
    assert!(matches!(err, IndexerError::Decode { ref txid, .. } if txid == "bad"));
}

#[tokio::test]
async fn invalidate_tip_requires_the_raw_block() {
    let (db, indexer, _log) = setup();
    indexer.index(&block(0, "h0", None, vec![])).await.unwrap();
    db.delete_model::<RawBlock>(&Key::from("h0")).unwrap();
    assert!(matches!(
        indexer.invalidate_tip().await.unwrap_err(),
        IndexerError::MissingRawBlock { height: 0 }
    ));
}

// ─── IndexLoop ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn loop_follows_the_chain_and_recovers_from_reorg() {
    let (db, indexer, _log) = setup();
    let chain = vec![
        block(0, "h0", None, vec![]),
        block(1, "h1", Some("h0"), vec![tx("t1", default_scheme("A"))]),
        block(2, "h2", Some("h1"), vec![tx("t2", default_scheme("B"))]),
    ];
    let source = MemoryBlockSource::from_blocks(chain);
    let config = IndexerBuilder::new().network(Network::Regtest).build_config();
    let mut sync = IndexLoop::new(config, source, indexer);

    for expected in 0..=2 {
        match sync.sync_once().await.unwrap() {
            SyncOutcome::Indexed { height } => assert_eq!(height, expected),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert!(matches!(
        sync.sync_once().await.unwrap(),
        SyncOutcome::UpToDate { height: Some(2) }
    ));

    // the node replaces h1, h2 with a longer fork
    sync.source()
        .reorg(vec![
            block(1, "f1", Some("h0"), vec![]),
            block(2, "f2", Some("f1"), vec![]),
            block(3, "f3", Some("f2"), vec![]),
        ])
        .await;

    match sync.sync_once().await.unwrap() {
        SyncOutcome::Reorg(event) => {
            assert_eq!(event.depth(), 2);
            assert_eq!(event.common_ancestor, Some(0));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(db.get_model::<Note>(&Key::from("t1")).unwrap().is_none());

    while let SyncOutcome::Indexed { .. } = sync.sync_once().await.unwrap() {}
    assert_eq!(sync.indexer().tip().unwrap().unwrap().hash, "f3");
}

#[tokio::test]
async fn run_stops_on_shutdown() {
    let (_db, indexer, _log) = setup();
    let source = MemoryBlockSource::from_blocks(vec![block(0, "h0", None, vec![])]);
    let config = IndexerBuilder::new().poll_interval_ms(10).build_config();
    let mut sync = IndexLoop::new(config, source, indexer);

    let (stop, rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(async move {
        sync.run(rx).await.map(|_| sync)
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    stop.send(true).unwrap();
    let sync = handle.await.unwrap().unwrap();
    assert_eq!(sync.state(), dfindex_core::IndexerState::Stopped);
    assert_eq!(sync.indexer().tip().unwrap().unwrap().height, 0);
}

/// Answers every hash lookup with the same block.
struct StuckSource(RawBlock);

#[async_trait]
impl BlockSource for StuckSource {
    async fn get_block_count(&self) -> IndexerResult<u32> {
        Ok(5)
    }

    async fn get_block_hash(&self, height: u32) -> IndexerResult<String> {
        Ok(format!("h{height}"))
    }

    async fn get_block(&self, _hash: &str) -> IndexerResult<RawBlock> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn loop_rejects_a_block_from_the_wrong_height() {
    let (db, indexer, _log) = setup();
    let config = IndexerBuilder::new().start_height(0).build_config();
    let mut sync = IndexLoop::new(config, StuckSource(block(3, "h3", Some("h2"), vec![])), indexer);
    assert!(matches!(
        sync.sync_once().await.unwrap_err(),
        IndexerError::Aborted { .. }
    ));
    assert!(db.is_empty());
}

#[test]
fn database_port_is_object_safe() {
    let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
    assert!(db.get(b"missing").unwrap().is_none());
}
