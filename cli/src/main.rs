//! dfindex CLI: decode DfTx scripts and replay exported blocks.
//!
//! Usage:
//! ```bash
//! dfindex info
//! dfindex decode 6a...44665478...
//! dfindex replay blocks.jsonl --network regtest --db ./index
//! ```

use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::json;

use dfindex_codec::{decode_script_hex, Decoded};
use dfindex_core::{
    init_tracing, IndexLoop, IndexerBuilder, LogConfig, MainIndexer, MemoryBlockSource, Network,
    RawBlock, SyncOutcome,
};
use dfindex_indexers::default_indexers;
use dfindex_indexers::models::{LoanScheme, PoolPair, PriceTicker, Token};
use dfindex_storage::{Database, ModelDatabase, Query};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "info" => {
            cmd_info();
            Ok(())
        }
        "decode" => cmd_decode(&args[2..]),
        "replay" => cmd_replay(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("dfindex {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("dfindex {}", env!("CARGO_PKG_VERSION"));
    println!("Reorg-safe read-model indexer for DeFiChain custom transactions\n");
    println!("USAGE:");
    println!("    dfindex <COMMAND>\n");
    println!("COMMANDS:");
    println!("    info      Show networks, price intervals and storage backends");
    println!("    decode    Decode an output script and print the operation as JSON");
    println!("    replay    Index blocks from a JSON-lines export");
    println!("    version   Print version");
    println!("    help      Print this help\n");
    println!("REPLAY FLAGS:");
    println!("    --network <NAME>         mainnet | testnet | devnet | regtest  [default: mainnet]");
    println!("    --db <PATH>              RocksDB directory (feature: rocksdb)");
    println!("    --history-page-size <N>  Rows per backward history page      [default: 100]");
    println!("    --log-level <LEVEL>      trace | debug | info | warn | error   [default: info]");
    println!("    --json-logs              Emit JSON structured logs");
}

fn cmd_info() {
    println!("dfindex v{}", env!("CARGO_PKG_VERSION"));
    for network in Network::ALL {
        println!(
            "  {:<8} active price every {} blocks",
            network.as_str(),
            network.price_interval()
        );
    }
    let indexers: Vec<&str> = default_indexers().iter().map(|i| i.name()).collect();
    println!("  Indexers: {}", indexers.join(", "));
    if cfg!(feature = "rocksdb") {
        println!("  Storage backends: memory, RocksDB");
    } else {
        println!("  Storage backends: memory, RocksDB (feature: rocksdb)");
    }
}

fn cmd_decode(args: &[String]) -> anyhow::Result<()> {
    let Some(script) = args.first() else {
        bail!("decode needs a script hex argument");
    };
    match decode_script_hex(script.trim_start_matches("0x"))? {
        Decoded::Operation(dftx) => println!("{}", serde_json::to_string_pretty(&dftx)?),
        Decoded::Unrecognized => println!("not a DfTx script"),
    }
    Ok(())
}

struct ReplayArgs {
    path: String,
    network: Network,
    db: Option<String>,
    history_page_size: usize,
    log: LogConfig,
}

fn parse_replay(args: &[String]) -> anyhow::Result<ReplayArgs> {
    let mut path = None;
    let mut network = Network::Mainnet;
    let mut db = None;
    let mut history_page_size = 100;
    let mut log = LogConfig::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--network" => {
                i += 1;
                let name = args.get(i).context("--network needs a value")?;
                network = name.parse().map_err(anyhow::Error::msg)?;
            }
            "--db" => {
                i += 1;
                db = Some(args.get(i).context("--db needs a path")?.clone());
            }
            "--history-page-size" => {
                i += 1;
                history_page_size = args
                    .get(i)
                    .context("--history-page-size needs a value")?
                    .parse()
                    .context("invalid --history-page-size")?;
            }
            "--log-level" => {
                i += 1;
                log.level = args.get(i).context("--log-level needs a value")?.clone();
            }
            "--json-logs" => log.json = true,
            flag if flag.starts_with("--") => bail!("Unknown flag: {flag}"),
            file => path = Some(file.to_string()),
        }
        i += 1;
    }

    Ok(ReplayArgs {
        path: path.context("replay needs a blocks file")?,
        network,
        db,
        history_page_size,
        log,
    })
}

fn read_blocks(path: &str) -> anyhow::Result<Vec<RawBlock>> {
    let file = File::open(path).with_context(|| format!("cannot open {path}"))?;
    let mut blocks = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let block: RawBlock =
            serde_json::from_str(&line).with_context(|| format!("{path}:{}: invalid block", n + 1))?;
        blocks.push(block);
    }
    Ok(blocks)
}

fn open_database(path: Option<&str>) -> anyhow::Result<Arc<dyn Database>> {
    match path {
        #[cfg(feature = "rocksdb")]
        Some(path) => Ok(Arc::new(dfindex_storage::RocksDatabase::open(path)?)),
        #[cfg(not(feature = "rocksdb"))]
        Some(_) => bail!("--db requires a build with the rocksdb feature"),
        None => Ok(Arc::new(dfindex_storage::MemoryDatabase::new())),
    }
}

async fn cmd_replay(args: &[String]) -> anyhow::Result<()> {
    let args = parse_replay(args)?;
    init_tracing(&args.log).context("tracing already initialised")?;

    let blocks = read_blocks(&args.path)?;
    let Some(first) = blocks.first() else {
        bail!("{} holds no blocks", args.path);
    };
    let config = IndexerBuilder::new()
        .id("dfindex-replay")
        .network(args.network)
        .start_height(first.height)
        .history_page_size(args.history_page_size)
        .log(args.log.clone())
        .build_config();

    let db = open_database(args.db.as_deref())?;
    let indexer = MainIndexer::from_config(db.clone(), &config, default_indexers());
    let mut sync = IndexLoop::new(config, MemoryBlockSource::from_blocks(blocks), indexer);

    let (mut indexed, mut reorgs) = (0usize, 0usize);
    loop {
        match sync.sync_once().await? {
            SyncOutcome::Indexed { .. } => indexed += 1,
            SyncOutcome::Reorg(event) => {
                tracing::warn!(depth = event.depth(), "replay file contains a fork");
                reorgs += 1;
            }
            SyncOutcome::UpToDate { .. } => break,
        }
    }

    let tip = sync.indexer().tip()?;
    let summary = json!({
        "network": args.network.as_str(),
        "indexed": indexed,
        "reorgs": reorgs,
        "tip": tip.map(|t| json!({ "height": t.height, "hash": t.hash })),
        "tokens": db.query::<Token>("id", &Query::new())?.len(),
        "pool_pairs": db.query::<PoolPair>("pair", &Query::new())?.len(),
        "loan_schemes": db.query::<LoanScheme>("id", &Query::new())?.len(),
        "price_tickers": db.query::<PriceTicker>("id", &Query::new())?.len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
