// A hostile ledger that calls back into the vesting engine mid-settlement.
// Run with: cargo test -p basecore-vesting --test test_reentrancy

use async_trait::async_trait;
use basecore_domain::clock::ManualClock;
use basecore_domain::config::VestingConfig;
use basecore_domain::error::{EngineError, LedgerError};
use basecore_domain::ledger::{InMemoryLedger, Ledger, Transfer};
use basecore_domain::token::{AccountId, AssetId, TokenAmount};
use basecore_vesting::engine::VestingEngine;
use basecore_vesting::schedule::ScheduleRequest;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

const CUSTODY: &str = "vesting-custody";

#[derive(Default)]
struct ReentrantLedger {
    inner: InMemoryLedger,
    engine: OnceLock<Weak<VestingEngine<ReentrantLedger>>>,
    armed: AtomicBool,
    target: Mutex<Option<AccountId>>,
    outcomes: Mutex<Vec<Result<TokenAmount, EngineError>>>,
}

#[async_trait]
impl Ledger for ReentrantLedger {
    async fn balance_of(&self, asset: &AssetId, account: &AccountId) -> TokenAmount {
        self.inner.balance_of(asset, account).await
    }

    async fn settle(&self, transfers: &[Transfer]) -> Result<(), LedgerError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            let target = self.target.lock().unwrap().clone();
            let engine = self.engine.get().and_then(Weak::upgrade);
            if let (Some(engine), Some(target)) = (engine, target) {
                let released = engine.release(&target).await;
                let releasable = engine.get_releasable_amount(&target, u64::MAX).await;
                let mut outcomes = self.outcomes.lock().unwrap();
                outcomes.push(released);
                outcomes.push(releasable);
            }
        }
        self.inner.settle(transfers).await
    }
}

async fn setup() -> (Arc<VestingEngine<ReentrantLedger>>, Arc<ReentrantLedger>) {
    let ledger = Arc::new(ReentrantLedger::default());
    let clock = Arc::new(ManualClock::new(0));
    let engine = Arc::new(
        VestingEngine::new(
            ledger.clone(),
            clock.clone(),
            VestingConfig::default(),
            AccountId::new(CUSTODY),
        )
        .unwrap(),
    );
    let _ = ledger.engine.set(Arc::downgrade(&engine));

    let admin = AccountId::new("admin");
    let asset = AssetId::new("BASE");
    ledger
        .inner
        .mint(&asset, &admin, TokenAmount::from(10_000u64))
        .await;
    ledger
        .inner
        .approve(&asset, &admin, &AccountId::new(CUSTODY), TokenAmount::from(10_000u64))
        .await;
    for who in ["bob", "carol"] {
        engine
            .create_schedule(
                &admin,
                ScheduleRequest {
                    beneficiary: AccountId::new(who),
                    total_amount: TokenAmount::from(1_000u64),
                    cliff_duration: 0,
                    vesting_duration: 100,
                    revocable: true,
                },
            )
            .await
            .unwrap();
    }
    clock.set(100);
    (engine, ledger)
}

#[tokio::test]
async fn nested_release_of_same_schedule_is_rejected() {
    let (engine, ledger) = setup().await;
    let bob = AccountId::new("bob");
    *ledger.target.lock().unwrap() = Some(bob.clone());
    ledger.armed.store(true, Ordering::SeqCst);

    let released = engine.release(&bob).await.unwrap();
    assert_eq!(released, TokenAmount::from(1_000u64));

    let outcomes = ledger.outcomes.lock().unwrap().clone();
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], Err(EngineError::Reentrancy(_))));
    assert!(matches!(outcomes[1], Err(EngineError::Reentrancy(_))));

    // Paid exactly once.
    assert_eq!(
        ledger.balance_of(&AssetId::new("BASE"), &bob).await,
        TokenAmount::from(1_000u64)
    );
}

#[tokio::test]
async fn nested_release_of_other_schedule_proceeds() {
    let (engine, ledger) = setup().await;
    let carol = AccountId::new("carol");
    *ledger.target.lock().unwrap() = Some(carol.clone());
    ledger.armed.store(true, Ordering::SeqCst);

    engine.release(&AccountId::new("bob")).await.unwrap();

    let outcomes = ledger.outcomes.lock().unwrap().clone();
    assert_eq!(outcomes[0], Ok(TokenAmount::from(1_000u64)));
    assert_eq!(outcomes[1], Ok(TokenAmount::zero()));
    assert_eq!(
        ledger.balance_of(&AssetId::new("BASE"), &carol).await,
        TokenAmount::from(1_000u64)
    );
}
