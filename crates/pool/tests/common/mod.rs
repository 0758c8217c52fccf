#![allow(dead_code)]

use basecore_domain::clock::ManualClock;
use basecore_domain::config::PoolConfig;
use basecore_domain::ledger::InMemoryLedger;
use basecore_domain::token::{AccountId, AssetId, TokenAmount};
use basecore_pool::engine::PoolEngine;
use std::sync::Arc;

// Test constants
pub const DEFAULT_FEE_BPS: u32 = 30; // 0.30%
pub const START_TIME: u64 = 1_700_000_000;
pub const CUSTODY: &str = "pool-custody";

pub struct Market {
    pub engine: Arc<PoolEngine<InMemoryLedger>>,
    pub ledger: Arc<InMemoryLedger>,
    pub clock: Arc<ManualClock>,
    pub admin: AccountId,
    pub token_a: AssetId,
    pub token_b: AssetId,
}

/// Engine with one registered TokenA/TokenB pool.
pub async fn setup_market(fee_bps: u32) -> Market {
    let ledger = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(ManualClock::new(START_TIME));
    let admin = AccountId::new("admin");
    let engine = PoolEngine::new(
        ledger.clone(),
        clock.clone(),
        PoolConfig::default(),
        AccountId::new(CUSTODY),
    )
    .unwrap();
    let token_a = AssetId::new("TokenA");
    let token_b = AssetId::new("TokenB");
    engine
        .create_pool(&admin, &token_a, &token_b, fee_bps)
        .await
        .unwrap();
    Market {
        engine: Arc::new(engine),
        ledger,
        clock,
        admin,
        token_a,
        token_b,
    }
}

/// Mints both pool assets to `account` and approves the engine to pull them.
pub async fn fund(market: &Market, account: &AccountId, amount: TokenAmount) {
    for asset in [&market.token_a, &market.token_b] {
        market.ledger.mint(asset, account, amount).await;
        market
            .ledger
            .approve(asset, account, &AccountId::new(CUSTODY), amount)
            .await;
    }
}

pub fn amount(v: u64) -> TokenAmount {
    TokenAmount::from(v)
}
