//! Engine configuration.
//!
//! Values come from `Default` or from `BASECORE_*` environment variables.
//! Admin setters on the engines mutate the live copy afterwards.

use crate::error::ConfigError;
use crate::events::DEFAULT_EVENT_LOG_CAPACITY;
use crate::fees::{MAX_FEE_RATE_BPS, MAX_PROTOCOL_FEE_SHARE_BPS};
use crate::token::{AccountId, AssetId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default swap fee (0.30%).
pub const DEFAULT_FEE_RATE_BPS: u32 = 30;

/// Default upper bound on batch inputs.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Pool engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Account allowed to create pools and change fees.
    pub admin: AccountId,
    /// Account receiving protocol fees.
    pub fee_recipient: AccountId,
    /// Fee applied when a pool is created with a rate of zero.
    pub default_fee_rate_bps: u32,
    /// Share of each swap fee set aside for the protocol.
    pub protocol_fee_share_bps: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            admin: AccountId::new("admin"),
            fee_recipient: AccountId::new("admin"),
            default_fee_rate_bps: DEFAULT_FEE_RATE_BPS,
            protocol_fee_share_bps: 0,
        }
    }
}

impl PoolConfig {
    /// Checks fee bounds and identifiers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.is_null() || self.fee_recipient.is_null() {
            return Err(ConfigError::OutOfRange(
                "pool admin and fee recipient must be set".to_string(),
            ));
        }
        if self.default_fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(ConfigError::OutOfRange(format!(
                "default fee rate {} bps exceeds {} bps",
                self.default_fee_rate_bps, MAX_FEE_RATE_BPS
            )));
        }
        if self.protocol_fee_share_bps > MAX_PROTOCOL_FEE_SHARE_BPS {
            return Err(ConfigError::OutOfRange(format!(
                "protocol fee share {} bps exceeds {} bps",
                self.protocol_fee_share_bps, MAX_PROTOCOL_FEE_SHARE_BPS
            )));
        }
        Ok(())
    }
}

/// Vesting engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingConfig {
    /// Account allowed to create and revoke schedules.
    pub admin: AccountId,
    /// Asset escrowed and released by every schedule.
    pub vesting_asset: AssetId,
    /// Largest accepted batch.
    pub max_batch_size: usize,
}

impl Default for VestingConfig {
    fn default() -> Self {
        Self {
            admin: AccountId::new("admin"),
            vesting_asset: AssetId::new("BASE"),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl VestingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.is_null() || self.vesting_asset.is_null() {
            return Err(ConfigError::OutOfRange(
                "vesting admin and asset must be set".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::OutOfRange(
                "max batch size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings shared by both engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub pool: PoolConfig,
    pub vesting: VestingConfig,
    /// Ledger account holding pool reserves and vesting escrow.
    pub custody_account: AccountId,
    /// Number of events retained in memory.
    pub event_log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            vesting: VestingConfig::default(),
            custody_account: AccountId::new("basecore"),
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Reads overrides from `BASECORE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("BASECORE_ADMIN") {
            config.pool.admin = AccountId::new(v.clone());
            config.vesting.admin = AccountId::new(v);
        }
        if let Some(v) = lookup("BASECORE_FEE_RECIPIENT") {
            config.pool.fee_recipient = AccountId::new(v);
        }
        if let Some(v) = lookup("BASECORE_DEFAULT_FEE_BPS") {
            config.pool.default_fee_rate_bps = parse("BASECORE_DEFAULT_FEE_BPS", &v)?;
        }
        if let Some(v) = lookup("BASECORE_PROTOCOL_FEE_SHARE_BPS") {
            config.pool.protocol_fee_share_bps = parse("BASECORE_PROTOCOL_FEE_SHARE_BPS", &v)?;
        }
        if let Some(v) = lookup("BASECORE_VESTING_ASSET") {
            config.vesting.vesting_asset = AssetId::new(v);
        }
        if let Some(v) = lookup("BASECORE_MAX_BATCH_SIZE") {
            config.vesting.max_batch_size = parse("BASECORE_MAX_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("BASECORE_CUSTODY_ACCOUNT") {
            config.custody_account = AccountId::new(v);
        }
        if let Some(v) = lookup("BASECORE_EVENT_LOG_CAPACITY") {
            config.event_log_capacity = parse("BASECORE_EVENT_LOG_CAPACITY", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pool.validate()?;
        self.vesting.validate()?;
        if self.custody_account.is_null() {
            return Err(ConfigError::OutOfRange(
                "custody account must be set".to_string(),
            ));
        }
        if self.custody_account == self.pool.admin {
            return Err(ConfigError::OutOfRange(
                "custody account must differ from the admin".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
