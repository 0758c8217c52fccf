//! Vesting engine: escrowed schedules, releases, revocation and emergency controls.

use crate::schedule::{ScheduleRequest, VestingSchedule};
use basecore_domain::clock::Clock;
use basecore_domain::config::VestingConfig;
use basecore_domain::error::{ConfigError, EngineError};
use basecore_domain::events::{EventData, EventLog};
use basecore_domain::guard::{EntityKey, ensure_not_entered, exclusive};
use basecore_domain::ledger::{Ledger, Transfer};
use basecore_domain::token::{AccountId, AssetId, TokenAmount};
use basecore_domain::value_objects::Percentage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, error, info, warn};

type Slot = Arc<Mutex<Option<VestingSchedule>>>;

/// Engine-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VestingStats {
    /// Sum of every schedule's amount at creation.
    pub total_committed: TokenAmount,
    /// Paid out to beneficiaries.
    pub total_released: TokenAmount,
    /// Still owed to beneficiaries of active schedules.
    pub total_pending: TokenAmount,
    /// Returned to the administrator by revocations.
    pub total_revoked: TokenAmount,
    /// Moved out of escrow under emergency mode.
    pub total_emergency_withdrawn: TokenAmount,
    pub active_schedules: u64,
}

impl VestingStats {
    /// Tokens the engine should still hold in custody.
    pub fn escrow_balance(&self) -> TokenAmount {
        self.total_pending
            .saturating_sub(self.total_emergency_withdrawn)
    }
}

/// Outcome of a batch release.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReleaseReport {
    /// Beneficiaries paid and the amount each received.
    pub released: Vec<(AccountId, TokenAmount)>,
    /// Beneficiaries with no schedule or nothing releasable.
    pub skipped: Vec<AccountId>,
    pub total_released: TokenAmount,
}

#[derive(Debug, Default)]
struct EmergencyState {
    active: bool,
    withdrawers: HashSet<AccountId>,
}

/// Owns one schedule slot per beneficiary.
///
/// Each slot has its own mutex; batch operations lock the sorted set of
/// slots they touch, so concurrent batches cannot deadlock.
pub struct VestingEngine<L: Ledger + ?Sized> {
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    /// Account holding escrowed tokens.
    custody: AccountId,
    config: RwLock<VestingConfig>,
    schedules: RwLock<HashMap<AccountId, Slot>>,
    emergency: RwLock<EmergencyState>,
    stats: Mutex<VestingStats>,
    events: Arc<EventLog>,
}

impl<L: Ledger + ?Sized> VestingEngine<L> {
    /// Creates an engine with its own event log.
    ///
    /// # Errors
    /// Returns an error if `config` is out of range or `custody` is null.
    pub fn new(
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
        config: VestingConfig,
        custody: AccountId,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if custody.is_null() {
            return Err(ConfigError::OutOfRange(
                "custody account must be set".to_string(),
            ));
        }
        Ok(Self {
            ledger,
            clock,
            custody,
            config: RwLock::new(config),
            schedules: RwLock::new(HashMap::new()),
            emergency: RwLock::new(EmergencyState::default()),
            stats: Mutex::new(VestingStats::default()),
            events: Arc::new(EventLog::default()),
        })
    }

    /// Shares an event log with other engines.
    #[must_use]
    pub fn with_event_log(mut self, events: Arc<EventLog>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    pub fn custody_account(&self) -> &AccountId {
        &self.custody
    }

    pub async fn config(&self) -> VestingConfig {
        self.config.read().await.clone()
    }

    // Schedules

    /// Escrows `request.total_amount` from the administrator and starts a schedule now.
    pub async fn create_schedule(
        &self,
        caller: &AccountId,
        request: ScheduleRequest,
    ) -> Result<VestingSchedule, EngineError> {
        self.ensure_not_emergency().await?;
        self.require_admin(caller, "create_schedule").await?;
        request.validate()?;

        let beneficiary = request.beneficiary.clone();
        let slot = self.slot_or_insert(&beneficiary).await;
        let asset = self.vesting_asset().await;

        let result = exclusive(vec![EntityKey::Beneficiary(beneficiary.clone())], async {
            let mut current = slot.lock().await;
            if current.as_ref().is_some_and(|s| s.active) {
                return Err(EngineError::ScheduleExists(beneficiary.clone()));
            }
            let now = self.clock.now();
            let schedule = VestingSchedule::start(request, now);

            self.settle(
                "create_schedule",
                vec![self.escrow(&asset, caller, schedule.total_amount)],
            )
            .await?;

            *current = Some(schedule.clone());
            self.record_created(&[&schedule]).await;
            Ok(schedule)
        })
        .await;
        drop(slot);
        if result.is_err() {
            self.prune_empty_slots([&beneficiary]).await;
        }
        result
    }

    /// Creates many schedules with a single escrow transfer.
    ///
    /// Every entry is validated before anything moves; one bad entry rejects
    /// the whole batch.
    pub async fn create_schedules_batch(
        &self,
        caller: &AccountId,
        requests: Vec<ScheduleRequest>,
    ) -> Result<Vec<VestingSchedule>, EngineError> {
        self.ensure_not_emergency().await?;
        self.require_admin(caller, "create_schedules_batch").await?;
        self.check_batch_size(requests.len()).await?;

        let mut seen = BTreeSet::new();
        let mut total = TokenAmount::zero();
        for request in &requests {
            request.validate()?;
            if !seen.insert(request.beneficiary.clone()) {
                return Err(EngineError::ScheduleExists(request.beneficiary.clone()));
            }
            total = total.checked_add(request.total_amount)?;
        }

        let mut slots = BTreeMap::new();
        for beneficiary in &seen {
            slots.insert(beneficiary.clone(), self.slot_or_insert(beneficiary).await);
        }
        let asset = self.vesting_asset().await;
        let keys = seen.iter().cloned().map(EntityKey::Beneficiary).collect();

        let result = exclusive(keys, async {
            let mut guards = lock_sorted(slots).await;
            for (beneficiary, current) in &guards {
                if current.as_ref().is_some_and(|s| s.active) {
                    return Err(EngineError::ScheduleExists(beneficiary.clone()));
                }
            }

            let now = self.clock.now();
            let schedules: Vec<VestingSchedule> = requests
                .into_iter()
                .map(|request| VestingSchedule::start(request, now))
                .collect();

            self.settle(
                "create_schedules_batch",
                vec![self.escrow(&asset, caller, total)],
            )
            .await?;

            for schedule in &schedules {
                if let Some(current) = guards.get_mut(&schedule.beneficiary) {
                    **current = Some(schedule.clone());
                }
            }
            let created: Vec<&VestingSchedule> = schedules.iter().collect();
            self.record_created(&created).await;
            info!(count = schedules.len(), total = %total, "Vesting batch created");
            Ok(schedules)
        })
        .await;
        if result.is_err() {
            self.prune_empty_slots(&seen).await;
        }
        result
    }

    /// Pays out everything vested and unreleased. Anyone may call it; the
    /// tokens always go to the beneficiary.
    pub async fn release(&self, beneficiary: &AccountId) -> Result<TokenAmount, EngineError> {
        self.ensure_not_emergency().await?;
        let slot = self
            .existing_slot(beneficiary)
            .await
            .ok_or_else(|| EngineError::NoSchedule(beneficiary.clone()))?;
        let asset = self.vesting_asset().await;

        exclusive(vec![EntityKey::Beneficiary(beneficiary.clone())], async {
            let mut current = slot.lock().await;
            let schedule = current
                .as_mut()
                .ok_or_else(|| EngineError::NoSchedule(beneficiary.clone()))?;
            let now = self.clock.now();
            let amount = schedule.releasable_amount(now)?;
            if amount.is_zero() {
                return Err(EngineError::NothingToRelease(beneficiary.clone()));
            }
            let released = schedule.released_amount.checked_add(amount)?;

            self.settle("release", vec![self.payout(&asset, beneficiary, amount)])
                .await?;

            schedule.released_amount = released;
            self.record_released(&[(beneficiary.clone(), amount)], now)
                .await;
            Ok(amount)
        })
        .await
    }

    /// Releases for every listed beneficiary in one settlement.
    ///
    /// Entries without a schedule or with nothing releasable are skipped.
    pub async fn release_batch(
        &self,
        beneficiaries: &[AccountId],
    ) -> Result<ReleaseReport, EngineError> {
        self.ensure_not_emergency().await?;
        self.check_batch_size(beneficiaries.len()).await?;

        let unique: BTreeSet<AccountId> = beneficiaries.iter().cloned().collect();
        let mut report = ReleaseReport::default();
        let mut slots = BTreeMap::new();
        for beneficiary in unique {
            match self.existing_slot(&beneficiary).await {
                Some(slot) => {
                    slots.insert(beneficiary, slot);
                }
                None => {
                    debug!(beneficiary = %beneficiary, "Skipping release: no schedule");
                    report.skipped.push(beneficiary);
                }
            }
        }
        if slots.is_empty() {
            return Ok(report);
        }
        let asset = self.vesting_asset().await;
        let keys = slots.keys().cloned().map(EntityKey::Beneficiary).collect();

        exclusive(keys, async {
            let mut guards = lock_sorted(slots).await;
            let now = self.clock.now();
            let mut legs = Vec::new();
            let mut updates = Vec::new();
            let mut total = TokenAmount::zero();

            for (beneficiary, current) in &guards {
                let amount = match current.as_ref() {
                    Some(schedule) => schedule.releasable_amount(now)?,
                    None => TokenAmount::zero(),
                };
                if amount.is_zero() {
                    debug!(beneficiary = %beneficiary, "Skipping release: nothing vested");
                    report.skipped.push(beneficiary.clone());
                    continue;
                }
                total = total.checked_add(amount)?;
                legs.push(self.payout(&asset, beneficiary, amount));
                updates.push((beneficiary.clone(), amount));
            }
            if updates.is_empty() {
                return Ok(report);
            }

            self.settle("release_batch", legs).await?;

            for (beneficiary, amount) in &updates {
                if let Some(schedule) = guards.get_mut(beneficiary).and_then(|g| (**g).as_mut()) {
                    schedule.released_amount = schedule.released_amount.saturating_add(*amount);
                }
            }
            self.record_released(&updates, now).await;
            report.released = updates;
            report.total_released = total;
            report.skipped.sort();
            Ok(report)
        })
        .await
    }

    /// Returns the unreleased remainder to the administrator and freezes the schedule.
    pub async fn revoke_schedule(
        &self,
        caller: &AccountId,
        beneficiary: &AccountId,
    ) -> Result<TokenAmount, EngineError> {
        self.ensure_not_emergency().await?;
        self.require_admin(caller, "revoke_schedule").await?;
        let slot = self
            .existing_slot(beneficiary)
            .await
            .ok_or_else(|| EngineError::NoSchedule(beneficiary.clone()))?;
        let asset = self.vesting_asset().await;

        exclusive(vec![EntityKey::Beneficiary(beneficiary.clone())], async {
            let mut current = slot.lock().await;
            let schedule = current
                .as_mut()
                .filter(|s| s.active)
                .ok_or_else(|| EngineError::NoSchedule(beneficiary.clone()))?;
            if !schedule.revocable {
                warn!(beneficiary = %beneficiary, "Rejected revocation of non-revocable schedule");
                return Err(EngineError::NotRevocable(beneficiary.clone()));
            }
            let returned = schedule.unreleased_amount();

            if !returned.is_zero() {
                self.settle(
                    "revoke_schedule",
                    vec![self.payout(&asset, caller, returned)],
                )
                .await?;
            }

            let now = self.clock.now();
            schedule.total_amount = schedule.released_amount;
            schedule.active = false;
            schedule.revoked_at = Some(now);

            {
                let mut stats = self.stats.lock().await;
                stats.total_revoked = stats.total_revoked.saturating_add(returned);
                stats.total_pending = stats.total_pending.saturating_sub(returned);
                stats.active_schedules = stats.active_schedules.saturating_sub(1);
            }
            info!(beneficiary = %beneficiary, returned = %returned, "Vesting schedule revoked");
            self.events
                .record(
                    now,
                    EventData::ScheduleRevoked {
                        beneficiary: beneficiary.clone(),
                        returned,
                    },
                )
                .await;
            Ok(returned)
        })
        .await
    }

    // Queries

    /// The current or last (revoked) schedule of `beneficiary`.
    pub async fn get_vesting_schedule(
        &self,
        beneficiary: &AccountId,
    ) -> Result<VestingSchedule, EngineError> {
        ensure_not_entered(&EntityKey::Beneficiary(beneficiary.clone()))?;
        let slot = self
            .existing_slot(beneficiary)
            .await
            .ok_or_else(|| EngineError::NoSchedule(beneficiary.clone()))?;
        let schedule = slot.lock().await.clone();
        schedule.ok_or_else(|| EngineError::NoSchedule(beneficiary.clone()))
    }

    pub async fn get_vested_amount(
        &self,
        beneficiary: &AccountId,
        now: u64,
    ) -> Result<TokenAmount, EngineError> {
        self.get_vesting_schedule(beneficiary)
            .await?
            .vested_amount(now)
    }

    pub async fn get_releasable_amount(
        &self,
        beneficiary: &AccountId,
        now: u64,
    ) -> Result<TokenAmount, EngineError> {
        self.get_vesting_schedule(beneficiary)
            .await?
            .releasable_amount(now)
    }

    /// Vested share of the schedule at the engine's current time.
    pub async fn get_vesting_progress(
        &self,
        beneficiary: &AccountId,
    ) -> Result<Percentage, EngineError> {
        let schedule = self.get_vesting_schedule(beneficiary).await?;
        if schedule.total_amount.is_zero() {
            return Ok(Percentage::ZERO);
        }
        let vested = schedule.vested_amount(self.clock.now())?;
        Percentage::from_ratio(vested.0, schedule.total_amount.0)
            .ok_or(EngineError::ArithmeticOverflow("vesting progress"))
    }

    pub async fn get_vesting_stats(&self) -> VestingStats {
        *self.stats.lock().await
    }

    // Emergency controls

    pub async fn is_emergency_mode(&self) -> bool {
        self.emergency.read().await.active
    }

    /// Blocks or unblocks create, release and revoke.
    pub async fn set_emergency_mode(
        &self,
        caller: &AccountId,
        active: bool,
    ) -> Result<(), EngineError> {
        self.require_admin(caller, "set_emergency_mode").await?;
        self.emergency.write().await.active = active;
        warn!(active, "Emergency mode changed");
        self.events
            .record(self.clock.now(), EventData::EmergencyModeChanged { active })
            .await;
        Ok(())
    }

    pub async fn add_authorized_withdrawer(
        &self,
        caller: &AccountId,
        withdrawer: &AccountId,
    ) -> Result<(), EngineError> {
        self.require_admin(caller, "add_authorized_withdrawer").await?;
        if withdrawer.is_null() {
            return Err(EngineError::InvalidAccount);
        }
        self.emergency
            .write()
            .await
            .withdrawers
            .insert(withdrawer.clone());
        info!(withdrawer = %withdrawer, "Authorized withdrawer added");
        Ok(())
    }

    pub async fn remove_authorized_withdrawer(
        &self,
        caller: &AccountId,
        withdrawer: &AccountId,
    ) -> Result<(), EngineError> {
        self.require_admin(caller, "remove_authorized_withdrawer")
            .await?;
        self.emergency.write().await.withdrawers.remove(withdrawer);
        info!(withdrawer = %withdrawer, "Authorized withdrawer removed");
        Ok(())
    }

    pub async fn is_authorized_withdrawer(&self, account: &AccountId) -> bool {
        self.emergency.read().await.withdrawers.contains(account)
    }

    /// Moves escrowed tokens to `to` while emergency mode is active.
    ///
    /// The amount is bounded by what the engine itself escrowed. It is
    /// reserved in the counters before the transfer and released again if
    /// the transfer fails.
    pub async fn emergency_withdraw(
        &self,
        caller: &AccountId,
        to: &AccountId,
        amount: TokenAmount,
    ) -> Result<(), EngineError> {
        {
            let emergency = self.emergency.read().await;
            if !emergency.withdrawers.contains(caller) {
                warn!(caller = %caller, "Rejected emergency withdrawal");
                return Err(EngineError::Unauthorized(
                    caller.clone(),
                    "emergency_withdraw",
                ));
            }
            if !emergency.active {
                return Err(EngineError::EmergencyModeInactive);
            }
        }
        if to.is_null() {
            return Err(EngineError::InvalidAccount);
        }
        if amount.is_zero() {
            return Err(EngineError::InvalidAmount("withdrawal must be positive"));
        }

        {
            let mut stats = self.stats.lock().await;
            if amount > stats.escrow_balance() {
                return Err(EngineError::InvalidAmount("exceeds escrowed balance"));
            }
            stats.total_emergency_withdrawn = stats.total_emergency_withdrawn.saturating_add(amount);
        }

        let asset = self.vesting_asset().await;
        if let Err(e) = self
            .settle("emergency_withdraw", vec![self.payout(&asset, to, amount)])
            .await
        {
            let mut stats = self.stats.lock().await;
            stats.total_emergency_withdrawn = stats.total_emergency_withdrawn.saturating_sub(amount);
            return Err(e);
        }

        warn!(withdrawer = %caller, to = %to, amount = %amount, "Emergency withdrawal executed");
        self.events
            .record(
                self.clock.now(),
                EventData::EmergencyWithdrawal {
                    withdrawer: caller.clone(),
                    to: to.clone(),
                    amount,
                },
            )
            .await;
        Ok(())
    }

    // Internals

    async fn require_admin(
        &self,
        caller: &AccountId,
        operation: &'static str,
    ) -> Result<(), EngineError> {
        if caller != &self.config.read().await.admin {
            warn!(caller = %caller, operation, "Rejected admin call");
            return Err(EngineError::Unauthorized(caller.clone(), operation));
        }
        Ok(())
    }

    async fn ensure_not_emergency(&self) -> Result<(), EngineError> {
        if self.emergency.read().await.active {
            return Err(EngineError::EmergencyModeActive);
        }
        Ok(())
    }

    async fn check_batch_size(&self, len: usize) -> Result<(), EngineError> {
        let max = self.config.read().await.max_batch_size;
        if len == 0 {
            return Err(EngineError::InvalidBatch("batch is empty".to_string()));
        }
        if len > max {
            return Err(EngineError::InvalidBatch(format!(
                "batch of {len} exceeds limit of {max}"
            )));
        }
        Ok(())
    }

    async fn vesting_asset(&self) -> AssetId {
        self.config.read().await.vesting_asset.clone()
    }

    async fn existing_slot(&self, beneficiary: &AccountId) -> Option<Slot> {
        self.schedules.read().await.get(beneficiary).cloned()
    }

    async fn slot_or_insert(&self, beneficiary: &AccountId) -> Slot {
        if let Some(slot) = self.existing_slot(beneficiary).await {
            return slot;
        }
        self.schedules
            .write()
            .await
            .entry(beneficiary.clone())
            .or_default()
            .clone()
    }

    /// Drops slots a failed create left without a schedule. A slot some other
    /// task still holds is kept.
    async fn prune_empty_slots<'a>(&self, beneficiaries: impl IntoIterator<Item = &'a AccountId>) {
        let mut schedules = self.schedules.write().await;
        for beneficiary in beneficiaries {
            let empty = schedules.get(beneficiary).is_some_and(|slot| {
                Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|s| s.is_none())
            });
            if empty {
                debug!(beneficiary = %beneficiary, "Removing empty schedule slot");
                schedules.remove(beneficiary);
            }
        }
    }

    fn escrow(&self, asset: &AssetId, from: &AccountId, amount: TokenAmount) -> Transfer {
        Transfer::Pull {
            asset: asset.clone(),
            spender: self.custody.clone(),
            from: from.clone(),
            to: self.custody.clone(),
            amount,
        }
    }

    fn payout(&self, asset: &AssetId, to: &AccountId, amount: TokenAmount) -> Transfer {
        Transfer::Push {
            asset: asset.clone(),
            from: self.custody.clone(),
            to: to.clone(),
            amount,
        }
    }

    async fn settle(&self, operation: &'static str, legs: Vec<Transfer>) -> Result<(), EngineError> {
        self.ledger.settle(&legs).await.map_err(|e| {
            error!(operation, error = %e, "Settlement failed");
            EngineError::from(e)
        })
    }

    async fn record_created(&self, schedules: &[&VestingSchedule]) {
        {
            let mut stats = self.stats.lock().await;
            for schedule in schedules {
                stats.total_committed = stats.total_committed.saturating_add(schedule.total_amount);
                stats.total_pending = stats.total_pending.saturating_add(schedule.total_amount);
                stats.active_schedules += 1;
            }
        }
        for schedule in schedules {
            info!(
                beneficiary = %schedule.beneficiary,
                total = %schedule.total_amount,
                cliff = schedule.cliff_duration,
                duration = schedule.vesting_duration,
                "Vesting schedule created"
            );
            self.events
                .record(
                    schedule.start_time,
                    EventData::ScheduleCreated {
                        beneficiary: schedule.beneficiary.clone(),
                        total_amount: schedule.total_amount,
                        cliff_duration: schedule.cliff_duration,
                        vesting_duration: schedule.vesting_duration,
                    },
                )
                .await;
        }
    }

    async fn record_released(&self, releases: &[(AccountId, TokenAmount)], now: u64) {
        {
            let mut stats = self.stats.lock().await;
            for (_, amount) in releases {
                stats.total_released = stats.total_released.saturating_add(*amount);
                stats.total_pending = stats.total_pending.saturating_sub(*amount);
            }
        }
        for (beneficiary, amount) in releases {
            info!(beneficiary = %beneficiary, amount = %amount, "Vested tokens released");
            self.events
                .record(
                    now,
                    EventData::TokensReleased {
                        beneficiary: beneficiary.clone(),
                        amount: *amount,
                    },
                )
                .await;
        }
    }
}

/// Locks every slot in key order.
async fn lock_sorted(
    slots: BTreeMap<AccountId, Slot>,
) -> BTreeMap<AccountId, OwnedMutexGuard<Option<VestingSchedule>>> {
    let mut guards = BTreeMap::new();
    for (beneficiary, slot) in slots {
        guards.insert(beneficiary, slot.lock_owned().await);
    }
    guards
}

impl<L: Ledger + ?Sized> std::fmt::Debug for VestingEngine<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VestingEngine")
            .field("custody", &self.custody)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basecore_domain::clock::ManualClock;
    use basecore_domain::error::ErrorKind;
    use basecore_domain::events::EngineEventType;
    use basecore_domain::ledger::InMemoryLedger;
    use primitive_types::U256;

    const DAY: u64 = 86_400;
    const START: u64 = 1_000_000;

    struct Fixture {
        engine: VestingEngine<InMemoryLedger>,
        ledger: Arc<InMemoryLedger>,
        clock: Arc<ManualClock>,
        admin: AccountId,
        base: AssetId,
    }

    async fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryLedger::new());
        let clock = Arc::new(ManualClock::new(START));
        let admin = AccountId::new("admin");
        let custody = AccountId::new("vesting");
        let base = AssetId::new("BASE");
        ledger
            .mint(&base, &admin, TokenAmount::from(1_000_000u64))
            .await;
        ledger
            .approve(&base, &admin, &custody, TokenAmount::from(1_000_000u64))
            .await;
        let engine = VestingEngine::new(
            ledger.clone(),
            clock.clone(),
            VestingConfig::default(),
            custody,
        )
        .unwrap();
        Fixture {
            engine,
            ledger,
            clock,
            admin,
            base,
        }
    }

    fn request(who: &str, total: u64, revocable: bool) -> ScheduleRequest {
        ScheduleRequest {
            beneficiary: AccountId::new(who),
            total_amount: TokenAmount::from(total),
            cliff_duration: 30 * DAY,
            vesting_duration: 365 * DAY,
            revocable,
        }
    }

    #[tokio::test]
    async fn test_create_escrows_tokens() {
        let f = fixture().await;
        let schedule = f
            .engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();
        assert_eq!(schedule.start_time, START);
        assert_eq!(
            f.ledger.balance_of(&f.base, &AccountId::new("vesting")).await,
            TokenAmount::from(1_000u64)
        );
        assert_eq!(f.ledger.settlement_count(), 1);

        let stats = f.engine.get_vesting_stats().await;
        assert_eq!(stats.total_committed, TokenAmount::from(1_000u64));
        assert_eq!(stats.total_pending, TokenAmount::from(1_000u64));
        assert_eq!(stats.active_schedules, 1);
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let f = fixture().await;
        let err = f
            .engine
            .create_schedule(&AccountId::new("mallory"), request("bob", 1_000, true))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();
        let err = f
            .engine
            .create_schedule(&f.admin, request("bob", 5, true))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::ScheduleExists(AccountId::new("bob")));

        let err = f
            .engine
            .create_schedule(&f.admin, request("carol", 0, true))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        assert_eq!(f.ledger.settlement_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_escrow_leaves_no_schedule() {
        let f = fixture().await;
        f.ledger.set_fail_settlements(true);
        let err = f
            .engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTransfer);
        assert_eq!(
            f.engine
                .get_vesting_schedule(&AccountId::new("bob"))
                .await
                .unwrap_err(),
            EngineError::NoSchedule(AccountId::new("bob"))
        );
        assert_eq!(f.engine.get_vesting_stats().await, VestingStats::default());
        assert!(f.engine.schedules.read().await.is_empty());

        f.ledger.set_fail_settlements(false);
        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();
        assert_eq!(f.engine.schedules.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_revoke_keeps_schedule_active() {
        let f = fixture().await;
        let bob = AccountId::new("bob");
        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();
        f.clock.set(START + 182 * DAY);
        f.engine.release(&bob).await.unwrap();
        let before = f.engine.get_vesting_schedule(&bob).await.unwrap();

        f.ledger.set_fail_settlements(true);
        let err = f.engine.revoke_schedule(&f.admin, &bob).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTransfer);

        let after = f.engine.get_vesting_schedule(&bob).await.unwrap();
        assert!(after.active);
        assert_eq!(after.total_amount, TokenAmount::from(1_000u64));
        assert_eq!(after.revoked_at, None);
        assert_eq!(after, before);
        let stats = f.engine.get_vesting_stats().await;
        assert!(stats.total_revoked.is_zero());
        assert_eq!(stats.total_pending, TokenAmount::from(547u64));
        assert_eq!(stats.active_schedules, 1);
        assert_eq!(
            f.ledger.balance_of(&f.base, &f.admin).await,
            TokenAmount::from(999_000u64)
        );
    }

    #[tokio::test]
    async fn test_failed_batch_create_leaves_nothing() {
        let f = fixture().await;
        f.ledger.set_fail_settlements(true);
        let err = f
            .engine
            .create_schedules_batch(
                &f.admin,
                vec![request("bob", 100, true), request("carol", 300, false)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTransfer);

        for who in ["bob", "carol"] {
            assert_eq!(
                f.engine
                    .get_vesting_schedule(&AccountId::new(who))
                    .await
                    .unwrap_err(),
                EngineError::NoSchedule(AccountId::new(who))
            );
        }
        let stats = f.engine.get_vesting_stats().await;
        assert!(stats.total_committed.is_zero());
        assert_eq!(stats.active_schedules, 0);
        assert!(f.engine.schedules.read().await.is_empty());
        assert!(
            f.engine
                .events()
                .events_of_type(EngineEventType::ScheduleCreated)
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_failed_batch_create_keeps_revoked_schedule() {
        let f = fixture().await;
        let bob = AccountId::new("bob");
        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();
        f.engine.revoke_schedule(&f.admin, &bob).await.unwrap();

        f.ledger.set_fail_settlements(true);
        f.engine
            .create_schedules_batch(
                &f.admin,
                vec![request("bob", 100, true), request("carol", 300, false)],
            )
            .await
            .unwrap_err();

        let schedules = f.engine.schedules.read().await;
        assert_eq!(schedules.len(), 1);
        assert!(schedules.contains_key(&bob));
        drop(schedules);
        assert!(!f.engine.get_vesting_schedule(&bob).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_release_is_idempotent_at_fixed_time() {
        let f = fixture().await;
        let bob = AccountId::new("bob");
        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();

        f.clock.advance(29 * DAY);
        assert_eq!(
            f.engine.release(&bob).await.unwrap_err(),
            EngineError::NothingToRelease(bob.clone())
        );

        f.clock.set(START + 182 * DAY);
        assert_eq!(
            f.engine.release(&bob).await.unwrap(),
            TokenAmount::from(453u64)
        );
        assert_eq!(
            f.engine.release(&bob).await.unwrap_err(),
            EngineError::NothingToRelease(bob.clone())
        );
        assert_eq!(
            f.ledger.balance_of(&f.base, &bob).await,
            TokenAmount::from(453u64)
        );
    }

    #[tokio::test]
    async fn test_revoke_returns_unreleased_to_admin() {
        let f = fixture().await;
        let bob = AccountId::new("bob");
        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();
        f.clock.set(START + 182 * DAY);
        f.engine.release(&bob).await.unwrap();

        let returned = f.engine.revoke_schedule(&f.admin, &bob).await.unwrap();
        assert_eq!(returned, TokenAmount::from(547u64));
        assert_eq!(
            f.ledger.balance_of(&f.base, &f.admin).await,
            TokenAmount::from(999_547u64)
        );

        let schedule = f.engine.get_vesting_schedule(&bob).await.unwrap();
        assert!(!schedule.active);
        assert_eq!(schedule.revoked_at, Some(START + 182 * DAY));
        f.clock.set(START + 400 * DAY);
        assert!(f.engine.get_releasable_amount(&bob, f.clock.now()).await.unwrap().is_zero());

        // Revoked twice is no longer an active schedule.
        assert_eq!(
            f.engine.revoke_schedule(&f.admin, &bob).await.unwrap_err(),
            EngineError::NoSchedule(bob.clone())
        );

        let stats = f.engine.get_vesting_stats().await;
        assert_eq!(stats.total_revoked, TokenAmount::from(547u64));
        assert!(stats.total_pending.is_zero());
        assert_eq!(stats.active_schedules, 0);
    }

    #[tokio::test]
    async fn test_non_revocable_schedule() {
        let f = fixture().await;
        let bob = AccountId::new("bob");
        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, false))
            .await
            .unwrap();
        assert_eq!(
            f.engine.revoke_schedule(&f.admin, &bob).await.unwrap_err(),
            EngineError::NotRevocable(bob)
        );
    }

    #[tokio::test]
    async fn test_new_schedule_after_revocation() {
        let f = fixture().await;
        let bob = AccountId::new("bob");
        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();
        f.engine.revoke_schedule(&f.admin, &bob).await.unwrap();
        let fresh = f
            .engine
            .create_schedule(&f.admin, request("bob", 200, true))
            .await
            .unwrap();
        assert!(fresh.active);
        assert_eq!(fresh.total_amount, TokenAmount::from(200u64));
        assert_eq!(f.engine.get_vesting_stats().await.active_schedules, 1);
    }

    #[tokio::test]
    async fn test_batch_create_is_all_or_nothing() {
        let f = fixture().await;
        let err = f
            .engine
            .create_schedules_batch(
                &f.admin,
                vec![request("bob", 100, true), request("carol", 0, true)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));

        let err = f
            .engine
            .create_schedules_batch(
                &f.admin,
                vec![request("bob", 100, true), request("bob", 50, true)],
            )
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::ScheduleExists(AccountId::new("bob")));

        let err = f
            .engine
            .create_schedules_batch(&f.admin, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidBatch(_)));
        assert_eq!(f.ledger.settlement_count(), 0);

        let created = f
            .engine
            .create_schedules_batch(
                &f.admin,
                vec![request("bob", 100, true), request("carol", 300, false)],
            )
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(f.ledger.settlement_count(), 1);
        assert_eq!(
            f.engine.get_vesting_stats().await.total_committed,
            TokenAmount::from(400u64)
        );
        let events = f
            .engine
            .events()
            .events_of_type(EngineEventType::ScheduleCreated)
            .await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_size_limit() {
        let f = fixture().await;
        let requests: Vec<ScheduleRequest> = (0..101)
            .map(|i| request(&format!("user-{i}"), 1, true))
            .collect();
        let err = f
            .engine
            .create_schedules_batch(&f.admin, requests)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidBatch("batch of 101 exceeds limit of 100".to_string())
        );
    }

    #[tokio::test]
    async fn test_release_batch_skips_empty_entries() {
        let f = fixture().await;
        f.engine
            .create_schedules_batch(
                &f.admin,
                vec![request("bob", 1_000, true), request("carol", 2_000, true)],
            )
            .await
            .unwrap();
        f.clock.set(START + 365 * DAY);
        f.engine.release(&AccountId::new("carol")).await.unwrap();
        let before = f.ledger.settlement_count();

        let report = f
            .engine
            .release_batch(&[
                AccountId::new("bob"),
                AccountId::new("carol"),
                AccountId::new("dave"),
                AccountId::new("bob"),
            ])
            .await
            .unwrap();
        assert_eq!(
            report.released,
            vec![(AccountId::new("bob"), TokenAmount::from(1_000u64))]
        );
        assert_eq!(
            report.skipped,
            vec![AccountId::new("carol"), AccountId::new("dave")]
        );
        assert_eq!(report.total_released, TokenAmount::from(1_000u64));
        assert_eq!(f.ledger.settlement_count(), before + 1);
    }

    #[tokio::test]
    async fn test_failed_release_batch_keeps_released_amounts() {
        let f = fixture().await;
        let bob = AccountId::new("bob");
        let carol = AccountId::new("carol");
        f.engine
            .create_schedules_batch(
                &f.admin,
                vec![request("bob", 1_000, true), request("carol", 2_000, true)],
            )
            .await
            .unwrap();
        f.clock.set(START + 100 * DAY);
        f.engine.release(&carol).await.unwrap();
        f.clock.set(START + 200 * DAY);
        let bob_before = f.engine.get_vesting_schedule(&bob).await.unwrap();
        let carol_before = f.engine.get_vesting_schedule(&carol).await.unwrap();
        let stats_before = f.engine.get_vesting_stats().await;

        f.ledger.set_fail_settlements(true);
        let err = f
            .engine
            .release_batch(&[bob.clone(), carol.clone()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTransfer);

        assert_eq!(
            f.engine.get_vesting_schedule(&bob).await.unwrap().released_amount,
            bob_before.released_amount
        );
        assert_eq!(
            f.engine.get_vesting_schedule(&carol).await.unwrap().released_amount,
            carol_before.released_amount
        );
        assert_eq!(f.engine.get_vesting_stats().await, stats_before);
        assert!(f.ledger.balance_of(&f.base, &bob).await.is_zero());

        f.ledger.set_fail_settlements(false);
        let report = f.engine.release_batch(&[bob, carol]).await.unwrap();
        assert_eq!(report.released.len(), 2);
    }

    #[tokio::test]
    async fn test_emergency_mode_gates_operations() {
        let f = fixture().await;
        let bob = AccountId::new("bob");
        let ops = AccountId::new("ops");
        let vault = AccountId::new("vault");
        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();
        f.engine
            .add_authorized_withdrawer(&f.admin, &ops)
            .await
            .unwrap();

        assert_eq!(
            f.engine
                .emergency_withdraw(&ops, &vault, TokenAmount::from(10u64))
                .await
                .unwrap_err(),
            EngineError::EmergencyModeInactive
        );

        f.engine.set_emergency_mode(&f.admin, true).await.unwrap();
        assert_eq!(
            f.engine.release(&bob).await.unwrap_err(),
            EngineError::EmergencyModeActive
        );
        assert_eq!(
            f.engine
                .create_schedule(&f.admin, request("carol", 10, true))
                .await
                .unwrap_err(),
            EngineError::EmergencyModeActive
        );
        assert_eq!(
            f.engine.revoke_schedule(&f.admin, &bob).await.unwrap_err(),
            EngineError::EmergencyModeActive
        );

        let err = f
            .engine
            .emergency_withdraw(&f.admin, &vault, TokenAmount::from(10u64))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let err = f
            .engine
            .emergency_withdraw(&ops, &vault, TokenAmount::from(1_001u64))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));

        f.engine
            .emergency_withdraw(&ops, &vault, TokenAmount::from(600u64))
            .await
            .unwrap();
        assert_eq!(
            f.ledger.balance_of(&f.base, &vault).await,
            TokenAmount::from(600u64)
        );
        let stats = f.engine.get_vesting_stats().await;
        assert_eq!(stats.total_emergency_withdrawn, TokenAmount::from(600u64));
        assert_eq!(stats.escrow_balance(), TokenAmount::from(400u64));

        f.engine
            .remove_authorized_withdrawer(&f.admin, &ops)
            .await
            .unwrap();
        assert!(!f.engine.is_authorized_withdrawer(&ops).await);
        f.engine.set_emergency_mode(&f.admin, false).await.unwrap();
        assert!(!f.engine.is_emergency_mode().await);
    }

    #[tokio::test]
    async fn test_failed_emergency_withdrawal_restores_counters() {
        let f = fixture().await;
        let ops = AccountId::new("ops");
        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();
        f.engine
            .add_authorized_withdrawer(&f.admin, &ops)
            .await
            .unwrap();
        f.engine.set_emergency_mode(&f.admin, true).await.unwrap();

        f.ledger.set_fail_settlements(true);
        let err = f
            .engine
            .emergency_withdraw(&ops, &AccountId::new("vault"), TokenAmount::from(100u64))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTransfer);
        assert!(
            f.engine
                .get_vesting_stats()
                .await
                .total_emergency_withdrawn
                .is_zero()
        );
    }

    #[tokio::test]
    async fn test_vesting_progress() {
        let f = fixture().await;
        let bob = AccountId::new("bob");
        f.engine
            .create_schedule(&f.admin, request("bob", 1_000, true))
            .await
            .unwrap();
        assert_eq!(
            f.engine.get_vesting_progress(&bob).await.unwrap(),
            Percentage::ZERO
        );
        f.clock.set(START + 182 * DAY);
        assert_eq!(
            f.engine.get_vesting_progress(&bob).await.unwrap(),
            Percentage::from_bps(4_530)
        );
        f.clock.set(START + 365 * DAY);
        assert_eq!(
            f.engine.get_vesting_progress(&bob).await.unwrap(),
            Percentage::ONE_HUNDRED
        );
    }

    #[tokio::test]
    async fn test_vesting_progress_with_huge_total() {
        let f = fixture().await;
        let whale = AccountId::new("whale");
        let total = TokenAmount(U256::exp10(60));
        f.ledger.mint(&f.base, &f.admin, total).await;
        f.ledger
            .approve(&f.base, &f.admin, &AccountId::new("vesting"), total)
            .await;
        f.engine
            .create_schedule(
                &f.admin,
                ScheduleRequest {
                    total_amount: total,
                    ..request("whale", 1, true)
                },
            )
            .await
            .unwrap();

        // Halfway through the post-cliff span.
        f.clock.set(START + 30 * DAY + 335 * DAY / 2);
        assert_eq!(
            f.engine.get_vesting_progress(&whale).await.unwrap(),
            Percentage::from_bps(5_000)
        );
        f.clock.set(START + 365 * DAY);
        assert_eq!(
            f.engine.get_vesting_progress(&whale).await.unwrap(),
            Percentage::ONE_HUNDRED
        );
    }
}
