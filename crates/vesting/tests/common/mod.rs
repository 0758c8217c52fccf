#![allow(dead_code)]

use basecore_domain::clock::ManualClock;
use basecore_domain::config::VestingConfig;
use basecore_domain::ledger::InMemoryLedger;
use basecore_domain::token::{AccountId, AssetId, TokenAmount};
use basecore_vesting::engine::VestingEngine;
use basecore_vesting::schedule::ScheduleRequest;
use std::sync::Arc;

// Test constants
pub const DAY: u64 = 86_400;
pub const START_TIME: u64 = 1_700_000_000;
pub const CUSTODY: &str = "vesting-custody";
pub const TREASURY: u64 = 10_000_000;

pub struct Program {
    pub engine: Arc<VestingEngine<InMemoryLedger>>,
    pub ledger: Arc<InMemoryLedger>,
    pub clock: Arc<ManualClock>,
    pub admin: AccountId,
    pub asset: AssetId,
}

/// Engine whose administrator holds and has approved `TREASURY` tokens.
pub async fn setup_program() -> Program {
    let ledger = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(ManualClock::new(START_TIME));
    let config = VestingConfig::default();
    let admin = config.admin.clone();
    let asset = config.vesting_asset.clone();
    let custody = AccountId::new(CUSTODY);
    ledger.mint(&asset, &admin, amount(TREASURY)).await;
    ledger
        .approve(&asset, &admin, &custody, amount(TREASURY))
        .await;
    let engine = VestingEngine::new(ledger.clone(), clock.clone(), config, custody).unwrap();
    Program {
        engine: Arc::new(engine),
        ledger,
        clock,
        admin,
        asset,
    }
}

pub fn schedule(beneficiary: &str, total: u64, cliff_days: u64, duration_days: u64) -> ScheduleRequest {
    ScheduleRequest {
        beneficiary: AccountId::new(beneficiary),
        total_amount: amount(total),
        cliff_duration: cliff_days * DAY,
        vesting_duration: duration_days * DAY,
        revocable: true,
    }
}

pub fn amount(v: u64) -> TokenAmount {
    TokenAmount::from(v)
}

impl Program {
    pub async fn ledger_balance(&self, account: &AccountId) -> TokenAmount {
        use basecore_domain::ledger::Ledger;
        self.ledger.balance_of(&self.asset, account).await
    }
}
