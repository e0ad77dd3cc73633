//! Index a chain touching every operation family, then invalidate it block
//! by block; each invalidate must leave the store byte-identical to its
//! state before the block.

mod common;

use common::{block_time, d, script, txid, Chain};

use dfindex_codec::ops::{self, ACTIVATE_NOW};
use dfindex_codec::{CurrencyAmount, CurrencyPair, DfTx, ScriptBalances, TokenAmount, TokenBalance, TokenPrice};
use dfindex_indexers::models::{
    CollateralToken, DefaultLoanScheme, LoanScheme, LoanToken, Masternode, Oracle,
    pair_key, OraclePriceActive, OraclePriceAggregated, OracleTokenCurrency, PoolPair, PoolSwap,
    PriceTicker, Token, Vault, VaultAuctionBid,
};
use dfindex_storage::{Key, ModelDatabase, Query};

fn create_token(symbol: &str, is_dat: bool) -> DfTx {
    DfTx::CreateToken(ops::CreateToken {
        symbol: symbol.into(),
        name: format!("{symbol} token"),
        decimal: 8,
        limit: d("0"),
        is_dat,
        tradeable: true,
        mintable: true,
    })
}

fn set_scheme(id: &str, ratio: u32, update: u64) -> DfTx {
    DfTx::SetLoanScheme(ops::SetLoanScheme {
        ratio,
        rate: d("5"),
        identifier: id.into(),
        update,
    })
}

fn usd(token: &str) -> CurrencyPair {
    CurrencyPair::new(token, "USD")
}

fn appoint(weightage: u8) -> DfTx {
    DfTx::AppointOracle(ops::AppointOracle {
        script: script(9),
        weightage,
        price_feeds: vec![usd("BTC")],
    })
}

fn price(oracle_id: &str, amount: &str, timestamp: i64) -> DfTx {
    DfTx::SetOracleData(ops::SetOracleData {
        oracle_id: oracle_id.into(),
        timestamp,
        token_prices: vec![TokenPrice {
            token: "BTC".into(),
            prices: vec![CurrencyAmount {
                currency: "USD".into(),
                amount: d(amount),
            }],
        }],
    })
}

fn create_pool(a: u32, b: u32) -> DfTx {
    DfTx::CreatePoolPair(ops::CreatePoolPair {
        token_a: a,
        token_b: b,
        commission: d("0"),
        owner_address: script(1),
        status: true,
        pair_symbol: String::new(),
        custom_rewards: vec![],
    })
}

fn add_liquidity(a: (u32, &str), b: (u32, &str)) -> DfTx {
    DfTx::PoolAddLiquidity(ops::PoolAddLiquidity {
        from: vec![ScriptBalances {
            script: script(2),
            balances: vec![
                TokenBalance { token: a.0, amount: d(a.1) },
                TokenBalance { token: b.0, amount: d(b.1) },
            ],
        }],
        share_address: script(2),
    })
}

fn swap(from: (u32, &str), to: u32) -> ops::PoolSwap {
    ops::PoolSwap {
        from_script: script(3),
        from_token: from.0,
        from_amount: d(from.1),
        to_script: script(3),
        to_token: to,
        max_price: d("9999999"),
    }
}

#[tokio::test]
async fn every_block_round_trips() {
    let mut chain = Chain::new();

    // 0: genesis
    chain.mine(vec![]).await;
    assert_eq!(chain.get::<Token>(0u32).unwrap().symbol, "DFI");

    // 1: tokens, a scheme, two oracles
    chain
        .mine(vec![
            create_token("BTC", true),
            create_token("CAT", false),
            create_token("C", true),
            set_scheme("C150", 150, 0),
            appoint(1),
            appoint(2),
        ])
        .await;
    let (oracle_a, oracle_b) = (txid(1, 4), txid(1, 5));
    assert_eq!(chain.get::<Token>(1u32).unwrap().symbol, "BTC");
    assert_eq!(chain.get::<Token>(128u32).unwrap().display_symbol(), "CAT#128");
    assert_eq!(chain.get::<LoanScheme>("C150").unwrap().ratio, 150);

    // 2: pools, default scheme, oracle prices
    chain
        .mine(vec![
            create_pool(1, 0),
            create_pool(2, 0),
            DfTx::SetDefaultLoanScheme(ops::SetDefaultLoanScheme {
                identifier: "C150".into(),
            }),
            price(&oracle_a, "0.5", block_time(2)),
            price(&oracle_b, "1.5", block_time(2)),
        ])
        .await;
    let btc_dfi = chain.get::<PoolPair>(3u32).unwrap();
    assert_eq!(btc_dfi.symbol, "BTC-DFI");
    assert!(chain.get::<Token>(3u32).unwrap().is_lps);
    let ticker = chain.get::<PriceTicker>(pair_key(&usd("BTC"))).unwrap();
    assert_eq!(ticker.id, "BTC-USD");
    assert_eq!(ticker.price.amount, d("1.16666667"));
    assert_eq!(ticker.price.oracles.active, 2);
    assert_eq!(
        chain.get::<DefaultLoanScheme>(DefaultLoanScheme::key()).unwrap().scheme_id,
        "C150"
    );

    // 3: liquidity, a composite swap, collateral and loan tokens
    chain
        .mine(vec![
            add_liquidity((1, "100"), (0, "200")),
            add_liquidity((2, "100"), (0, "200")),
            DfTx::CompositeSwap(ops::CompositeSwap {
                swap: swap((1, "10"), 2),
                pools: vec![3, 4],
            }),
            DfTx::SetCollateralToken(ops::SetCollateralToken {
                token: 0,
                factor: d("1"),
                currency_pair: CurrencyPair::new("DFI", "USD"),
                activate_after_block: 0,
            }),
            DfTx::SetLoanToken(ops::SetLoanToken {
                symbol: "TSLA".into(),
                name: "Tesla".into(),
                currency_pair: usd("TSLA"),
                mintable: true,
                interest: d("1"),
            }),
        ])
        .await;
    let hops = chain
        .db
        .query::<PoolSwap>("txid", &Query::partition(Key::from(txid(3, 2))))
        .unwrap();
    assert_eq!(hops.len(), 2);
    assert_eq!((hops[0].reserve_a, hops[0].reserve_b), (d("110"), d("181.81818181")));
    assert_eq!(hops[0].to_amount, d("18.18181819"));
    assert_eq!(hops[1].from_amount, d("18.18181819"));
    assert_eq!(hops[1].reserve_b, d("218.18181819"));
    let btc_dfi = chain.get::<PoolPair>(3u32).unwrap();
    assert_eq!((btc_dfi.token_a.reserve, btc_dfi.token_b.reserve), (d("100"), d("200")));
    assert_eq!(chain.get::<CollateralToken>(0u32).unwrap().activate_after_block, 3);
    assert!(chain.get::<Token>(5u32).unwrap().is_loan_token);

    // 4: a vault takes a loan; mint; a direct swap
    chain
        .mine(vec![
            DfTx::CreateVault(ops::CreateVault {
                owner_address: script(4),
                scheme_id: String::new(),
            }),
            DfTx::DepositToVault(ops::DepositToVault {
                vault_id: txid(4, 0),
                from: script(4),
                token_amount: TokenAmount { token: 0, amount: d("100") },
            }),
            DfTx::TakeLoan(ops::TakeLoan {
                vault_id: txid(4, 0),
                to: script(4),
                token_amounts: vec![TokenBalance { token: 5, amount: d("10") }],
            }),
            DfTx::MintToken(ops::MintToken {
                balances: vec![TokenBalance { token: 1, amount: d("5") }],
            }),
            DfTx::PoolSwap(swap((0, "1"), 1)),
        ])
        .await;
    let vault_id = txid(4, 0);
    let vault = chain.get::<Vault>(vault_id.as_str()).unwrap();
    assert_eq!(vault.scheme_id, "C150");
    assert_eq!(vault.collateral_of(0), d("100"));
    assert_eq!(vault.loan_of(5), d("10"));
    assert_eq!(chain.get::<Token>(1u32).unwrap().minted, d("5"));

    // 5: oracle update, payback, withdraw, remove liquidity, masternode,
    //    one deferred update and one deferred destruction
    chain
        .mine(vec![
            DfTx::UpdateOracle(ops::UpdateOracle {
                oracle_id: oracle_b.clone(),
                script: script(9),
                weightage: 3,
                price_feeds: vec![usd("BTC"), usd("ETH")],
            }),
            DfTx::PaybackLoan(ops::PaybackLoan {
                vault_id: vault_id.clone(),
                from: script(4),
                token_amounts: vec![TokenBalance { token: 5, amount: d("4") }],
            }),
            DfTx::WithdrawFromVault(ops::WithdrawFromVault {
                vault_id: vault_id.clone(),
                to: script(4),
                token_amount: TokenAmount { token: 0, amount: d("50") },
            }),
            DfTx::PoolRemoveLiquidity(ops::PoolRemoveLiquidity {
                script: script(2),
                token: 3,
                amount: d("10"),
            }),
            DfTx::CreateMasternode(ops::CreateMasternode {
                operator_type: 1,
                operator_pub_key_hash: format!("{:040x}", 7),
                timelock: None,
            }),
            set_scheme("C200", 200, 10),
            set_scheme("C300", 300, ACTIVATE_NOW),
            DfTx::DestroyLoanScheme(ops::DestroyLoanScheme {
                identifier: "C300".into(),
                height: 8,
            }),
        ])
        .await;
    let subscription = OracleTokenCurrency::key(&usd("ETH"), &oracle_b);
    assert_eq!(chain.get::<OracleTokenCurrency>(subscription).unwrap().weightage, 3);
    let vault = chain.get::<Vault>(vault_id.as_str()).unwrap();
    assert_eq!((vault.collateral_of(0), vault.loan_of(5)), (d("50"), d("6")));
    assert!(chain.get::<LoanScheme>("C200").is_none());
    assert!(chain.get::<LoanScheme>("C300").is_some());

    // 6: price interval; bid, resign, removals and updates
    chain
        .mine(vec![
            DfTx::PlaceAuctionBid(ops::PlaceAuctionBid {
                vault_id: vault_id.clone(),
                index: 0,
                from: script(5),
                token_amount: TokenAmount { token: 0, amount: d("10") },
            }),
            DfTx::ResignMasternode(ops::ResignMasternode { node_id: txid(5, 4) }),
            DfTx::RemoveOracle(ops::RemoveOracle {
                oracle_id: oracle_a.clone(),
            }),
            DfTx::UpdateLoanToken(ops::UpdateLoanToken {
                symbol: "TSLA".into(),
                name: "Tesla Inc".into(),
                currency_pair: usd("TSLA"),
                mintable: false,
                interest: d("2"),
                token_tx: txid(3, 4),
            }),
            DfTx::UpdatePoolPair(ops::UpdatePoolPair {
                pool_id: 4,
                status: true,
                commission: d("0.002"),
                owner_address: String::new(),
                custom_rewards: vec![],
            }),
            DfTx::PaybackLoan(ops::PaybackLoan {
                vault_id: vault_id.clone(),
                from: script(4),
                token_amounts: vec![TokenBalance { token: 5, amount: d("6") }],
            }),
        ])
        .await;
    let active = chain
        .db
        .query::<OraclePriceActive>("pair", &Query::partition(pair_key(&usd("BTC"))).desc().limit(1))
        .unwrap();
    assert_eq!(active.len(), 1);
    assert!(active[0].is_live, "the block 2 aggregate had two oracles");
    assert_eq!(active[0].active.as_ref().unwrap().amount, d("1.16666667"));
    assert!(chain.get::<Oracle>(oracle_a.as_str()).is_none());
    assert!(chain.get::<Masternode>(txid(5, 4)).unwrap().resign.is_some());
    assert_eq!(chain.get::<LoanToken>(5u32).unwrap().name, "Tesla Inc");
    assert_eq!(chain.get::<PoolPair>(4u32).unwrap().commission, d("0.002"));
    assert_eq!(
        chain
            .db
            .query::<VaultAuctionBid>(
                "batch",
                &Query::partition(Key::Tuple(vec![Key::from(&vault_id), Key::U32(0)]))
            )
            .unwrap()
            .len(),
        1
    );

    // 7: close the vault
    chain
        .mine(vec![DfTx::CloseVault(ops::CloseVault {
            vault_id: vault_id.clone(),
            to: script(4),
        })])
        .await;
    assert!(chain.get::<Vault>(vault_id.as_str()).is_none());

    // 8..=10: deferred changes come due
    chain.mine(vec![]).await;
    assert!(chain.get::<LoanScheme>("C300").is_none());
    chain.mine_empty(2).await;
    assert_eq!(chain.get::<LoanScheme>("C200").unwrap().activation_height, 10);

    while chain.height().is_some() {
        chain.undo().await;
    }
    assert!(chain.db.is_empty());
}

#[tokio::test]
async fn aggregate_ignores_stale_feeds() {
    let mut chain = Chain::new();
    chain.mine(vec![]).await;
    chain.mine(vec![appoint(1), appoint(1)]).await;
    chain
        .mine(vec![
            price(&txid(1, 0), "10", block_time(2)),
            price(&txid(1, 1), "20", block_time(2) - 3601),
        ])
        .await;
    let aggregated = chain
        .get::<OraclePriceAggregated>(OraclePriceAggregated::key(&usd("BTC"), 2))
        .unwrap();
    assert_eq!(aggregated.amount, d("10"));
    assert_eq!((aggregated.oracles.active, aggregated.oracles.total), (1, 2));

    chain.undo().await;
    assert!(chain.get::<PriceTicker>(pair_key(&usd("BTC"))).is_none());
}

#[tokio::test]
async fn active_price_is_promoted_with_two_oracles() {
    let mut chain = Chain::new();
    chain.mine(vec![]).await;
    chain.mine(vec![appoint(1), appoint(1)]).await;
    chain
        .mine(vec![
            price(&txid(1, 0), "10", block_time(2)),
            price(&txid(1, 1), "12", block_time(2)),
        ])
        .await;
    chain.mine_empty(3).await;
    assert_eq!(chain.height(), Some(5));
    // 6 is the regtest price interval
    chain.mine(vec![]).await;

    let active = chain
        .get::<OraclePriceActive>(Key::Tuple(vec![
            Key::from("BTC"),
            Key::from("USD"),
            Key::U32(6),
        ]))
        .unwrap();
    assert!(active.is_live);
    assert_eq!(active.active.unwrap().amount, d("11"));

    chain.undo().await;
    assert!(chain
        .db
        .query::<OraclePriceActive>("pair", &Query::partition(pair_key(&usd("BTC"))))
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn active_price_comes_from_the_latest_aggregate() {
    let mut chain = Chain::new();
    chain.mine(vec![]).await;
    chain.mine(vec![appoint(1), appoint(1)]).await;
    let (oracle_a, oracle_b) = (txid(1, 0), txid(1, 1));
    chain
        .mine(vec![
            price(&oracle_a, "10", block_time(2)),
            price(&oracle_b, "12", block_time(2)),
        ])
        .await;
    chain
        .mine(vec![DfTx::RemoveOracle(ops::RemoveOracle { oracle_id: oracle_b })])
        .await;
    chain.mine_empty(2).await;
    chain.mine(vec![]).await;
    assert_eq!(chain.height(), Some(6));

    let active = chain
        .get::<OraclePriceActive>(Key::Tuple(vec![
            Key::from("BTC"),
            Key::from("USD"),
            Key::U32(6),
        ]))
        .unwrap();
    let next = active.next.unwrap();
    assert_eq!(next.amount, d("11"));
    assert_eq!(next.oracles.active, 2);
    assert!(active.is_live);
    assert_eq!(active.active.unwrap().amount, d("11"));

    chain.undo().await;
    chain.undo().await;
    chain.undo().await;
    chain.undo().await;
    assert!(chain.get::<Oracle>(txid(1, 1)).is_some());
}

#[tokio::test]
async fn stale_aggregate_is_not_promoted() {
    let mut chain = Chain::new();
    chain.mine(vec![]).await;
    chain.mine(vec![appoint(1), appoint(1)]).await;
    chain
        .mine(vec![
            price(&txid(1, 0), "10", block_time(2)),
            price(&txid(1, 1), "12", block_time(2)),
        ])
        .await;
    // Blocks are 30 s apart: the block 2 aggregate is promoted at 120 and
    // has left the feed window by the interval after it.
    chain.mine_empty(3 + 6 * 20).await;
    let interval = chain.height().unwrap();
    assert_eq!(interval % 6, 5);
    chain.mine(vec![]).await;
    assert!(block_time(interval + 1) - block_time(2) > 3600);

    let active = chain
        .db
        .query::<OraclePriceActive>("pair", &Query::partition(pair_key(&usd("BTC"))).desc().limit(1))
        .unwrap()
        .remove(0);
    assert_eq!(active.height, interval + 1);
    assert_eq!(active.next, None);
    assert!(!active.is_live);
    assert_eq!(active.active.unwrap().amount, d("11"), "previous price stays in force");
}

#[tokio::test]
async fn pairs_with_dashes_do_not_share_a_ticker() {
    let mut chain = Chain::new();
    chain.mine(vec![]).await;
    let feeds = vec![CurrencyPair::new("A-B", "C"), CurrencyPair::new("A", "B-C")];
    chain
        .mine(vec![DfTx::AppointOracle(ops::AppointOracle {
            script: script(9),
            weightage: 1,
            price_feeds: feeds.clone(),
        })])
        .await;
    let oracle = txid(1, 0);
    chain
        .mine(vec![DfTx::SetOracleData(ops::SetOracleData {
            oracle_id: oracle.clone(),
            timestamp: block_time(2),
            token_prices: vec![
                TokenPrice {
                    token: "A-B".into(),
                    prices: vec![CurrencyAmount { currency: "C".into(), amount: d("1") }],
                },
                TokenPrice {
                    token: "A".into(),
                    prices: vec![CurrencyAmount { currency: "B-C".into(), amount: d("2") }],
                },
            ],
        })])
        .await;

    for (pair, amount) in feeds.iter().zip(["1", "2"]) {
        let ticker = chain.get::<PriceTicker>(pair_key(pair)).unwrap();
        assert_eq!(ticker.price.amount, d(amount));
        assert_eq!(ticker.price.oracles.total, 1);
        let subscriptions = chain
            .db
            .query::<OracleTokenCurrency>("pair", &Query::partition(pair_key(pair)))
            .unwrap();
        assert_eq!(subscriptions.len(), 1);
    }
}

#[tokio::test]
async fn dat_ids_skip_dfi_when_genesis_was_not_indexed() {
    let chain = Chain::new();
    let mut block = chain.block(vec![create_token("BTC", true), create_token("CAT", false)]);
    block.height = 500;
    chain.indexer.index(&block).await.unwrap();

    assert!(chain.get::<Token>(0u32).is_none());
    assert_eq!(chain.get::<Token>(1u32).unwrap().symbol, "BTC");
    assert_eq!(chain.get::<Token>(128u32).unwrap().symbol, "CAT");
}

#[tokio::test]
async fn missing_prerequisite_aborts_the_block() {
    let mut chain = Chain::new();
    chain.mine(vec![]).await;
    let before = chain.db.snapshot();

    let orphan = DfTx::DepositToVault(ops::DepositToVault {
        vault_id: txid(9, 9),
        from: script(1),
        token_amount: TokenAmount { token: 0, amount: d("1") },
    });
    let block = chain.block(vec![create_token("BTC", true), orphan]);
    let err = chain.indexer.index(&block).await.unwrap_err();
    assert!(matches!(err, dfindex_core::IndexerError::NotFound { model: "Vault", .. }));
    assert_eq!(chain.db.snapshot(), before);
}

#[tokio::test]
async fn token_pages_never_repeat_or_skip() {
    let mut chain = Chain::new();
    chain.mine(vec![]).await;
    chain
        .mine(vec![
            create_token("A", true),
            create_token("B", true),
            create_token("C", true),
        ])
        .await;

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = chain
            .db
            .query_page::<Token>("id", &Query::new().limit(2).after(cursor))
            .unwrap();
        if page.is_empty() {
            assert!(page.next.is_none());
            break;
        }
        seen.extend(page.items.iter().map(|t| t.id));
        cursor = page.next;
    }
    assert_eq!(seen, vec![0, 1, 2, 3]);

    let descending: Vec<u32> = chain
        .db
        .query_page::<Token>("id", &Query::new().desc().limit(3))
        .unwrap()
        .items
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(descending, vec![3, 2, 1]);
}
