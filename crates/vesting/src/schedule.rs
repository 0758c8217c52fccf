//! Vesting schedules with a cliff and linear release.
//!
//! ```text
//! |----cliff----|--------linear vesting--------|
//! ^             ^                              ^
//! start         start + cliff                  start + duration
//! ```
//!
//! - Before the cliff: nothing vested
//! - From the cliff: `total * (now - start - cliff) / (duration - cliff)`
//! - From `start + duration`: everything vested
//!
//! All calculations use integer math; divisions round down.

use basecore_domain::error::EngineError;
use basecore_domain::math::mul_div;
use basecore_domain::token::{AccountId, TokenAmount};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Parameters of a schedule to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub beneficiary: AccountId,
    pub total_amount: TokenAmount,
    /// Seconds after start before anything vests.
    pub cliff_duration: u64,
    /// Seconds after start at which everything has vested.
    pub vesting_duration: u64,
    pub revocable: bool,
}

impl ScheduleRequest {
    /// Checks the request shape, independent of engine state.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.beneficiary.is_null() {
            return Err(EngineError::InvalidBeneficiary);
        }
        if self.total_amount.is_zero() {
            return Err(EngineError::InvalidAmount("vesting amount must be positive"));
        }
        if self.vesting_duration == 0 {
            return Err(EngineError::InvalidDuration(
                "vesting duration must be positive",
            ));
        }
        if self.cliff_duration > self.vesting_duration {
            return Err(EngineError::InvalidDuration(
                "cliff exceeds vesting duration",
            ));
        }
        Ok(())
    }
}

/// Where a schedule stands at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VestingStatus {
    /// Before the cliff.
    BeforeCliff,
    /// Between the cliff and the end of vesting.
    Vesting,
    /// Everything vested, some not yet released.
    FullyVested,
    /// Everything vested and released.
    Completed,
    /// Revoked by the administrator.
    Revoked,
}

impl std::fmt::Display for VestingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeforeCliff => write!(f, "Before cliff"),
            Self::Vesting => write!(f, "Vesting"),
            Self::FullyVested => write!(f, "Fully vested"),
            Self::Completed => write!(f, "Completed"),
            Self::Revoked => write!(f, "Revoked"),
        }
    }
}

/// One beneficiary's release plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub beneficiary: AccountId,
    /// Amount that will vest in total; frozen at `released_amount` on revocation.
    pub total_amount: TokenAmount,
    pub released_amount: TokenAmount,
    pub cliff_duration: u64,
    pub vesting_duration: u64,
    pub start_time: u64,
    pub revocable: bool,
    /// `false` once revoked; a new schedule may then be created.
    pub active: bool,
    pub revoked_at: Option<u64>,
}

impl VestingSchedule {
    /// Starts a schedule at `start_time` with nothing released.
    pub fn start(request: ScheduleRequest, start_time: u64) -> Self {
        Self {
            beneficiary: request.beneficiary,
            total_amount: request.total_amount,
            released_amount: TokenAmount::zero(),
            cliff_duration: request.cliff_duration,
            vesting_duration: request.vesting_duration,
            start_time,
            revocable: request.revocable,
            active: true,
            revoked_at: None,
        }
    }

    pub fn cliff_end(&self) -> u64 {
        self.start_time.saturating_add(self.cliff_duration)
    }

    pub fn vesting_end(&self) -> u64 {
        self.start_time.saturating_add(self.vesting_duration)
    }

    /// Amount vested at `now`. A revoked schedule is fully vested at its frozen total.
    pub fn vested_amount(&self, now: u64) -> Result<TokenAmount, EngineError> {
        if !self.active {
            return Ok(self.total_amount);
        }
        vested_amount(
            self.total_amount,
            self.start_time,
            self.cliff_duration,
            self.vesting_duration,
            now,
        )
    }

    /// Vested but not yet released.
    pub fn releasable_amount(&self, now: u64) -> Result<TokenAmount, EngineError> {
        Ok(self.vested_amount(now)?.saturating_sub(self.released_amount))
    }

    /// Still owed to the beneficiary, vested or not.
    pub fn unreleased_amount(&self) -> TokenAmount {
        self.total_amount.saturating_sub(self.released_amount)
    }

    pub fn status(&self, now: u64) -> VestingStatus {
        if !self.active {
            VestingStatus::Revoked
        } else if now < self.cliff_end() {
            VestingStatus::BeforeCliff
        } else if now < self.vesting_end() {
            VestingStatus::Vesting
        } else if self.released_amount < self.total_amount {
            VestingStatus::FullyVested
        } else {
            VestingStatus::Completed
        }
    }
}

/// The vesting curve.
///
/// Zero before `start + cliff`, `total` from `start + duration`, linear
/// (floor) in between. A cliff equal to the duration makes a single step.
pub fn vested_amount(
    total: TokenAmount,
    start_time: u64,
    cliff_duration: u64,
    vesting_duration: u64,
    now: u64,
) -> Result<TokenAmount, EngineError> {
    if now < start_time.saturating_add(cliff_duration) {
        return Ok(TokenAmount::zero());
    }
    if now >= start_time.saturating_add(vesting_duration) {
        return Ok(total);
    }
    let elapsed = now - start_time - cliff_duration;
    let span = vesting_duration - cliff_duration;
    mul_div(
        total.0,
        U256::from(elapsed),
        U256::from(span),
        "vested amount",
    )
    .map(TokenAmount)
}
