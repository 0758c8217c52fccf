//! Error taxonomy shared by the pool and vesting engines.

use crate::token::{AccountId, TokenAmount};
use serde::{Deserialize, Serialize};

/// Broad class of a rejected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad input shape or range.
    Validation,
    /// Operation conflicts with current engine state.
    StateConflict,
    /// Caller-supplied minimum not met.
    Slippage,
    /// Overflow or undefined ratio.
    Arithmetic,
    /// Caller is not allowed to perform the operation.
    Authorization,
    /// The ledger refused a transfer.
    ExternalTransfer,
}

/// Failure reported by a [`Ledger`](crate::ledger::Ledger) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Account balance is too low.
    #[error("insufficient balance of {asset} in {account}: has {available}, needs {required}")]
    InsufficientBalance {
        /// Asset being moved.
        asset: String,
        /// Account being debited.
        account: AccountId,
        /// Current balance.
        available: TokenAmount,
        /// Requested amount.
        required: TokenAmount,
    },
    /// Spender allowance is too low.
    #[error("insufficient allowance of {asset} from {owner} to {spender}")]
    InsufficientAllowance {
        /// Asset being moved.
        asset: String,
        /// Owner of the funds.
        owner: AccountId,
        /// Account spending the allowance.
        spender: AccountId,
    },
    /// A credit would overflow the recipient balance.
    #[error("balance overflow")]
    Overflow,
    /// Transfer rejected by the asset implementation.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Errors returned by engine entry points.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Both sides of a pair are the same asset.
    #[error("identical assets")]
    IdenticalAssets,
    /// An asset identifier is null.
    #[error("invalid asset identifier")]
    InvalidAsset,
    /// Fee rate outside the allowed range.
    #[error("invalid fee rate: {0} bps exceeds maximum of {1} bps")]
    InvalidFeeRate(u32, u32),
    /// Amount is zero or otherwise unusable.
    #[error("invalid amount: {0}")]
    InvalidAmount(&'static str),
    /// Beneficiary identifier is null.
    #[error("invalid beneficiary")]
    InvalidBeneficiary,
    /// Account identifier is null.
    #[error("invalid account identifier")]
    InvalidAccount,
    /// Vesting duration is zero or shorter than the cliff.
    #[error("invalid duration: {0}")]
    InvalidDuration(&'static str),
    /// Batch input is empty or above the configured bound.
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// A pool already exists for the pair.
    #[error("pool already exists for {0}")]
    DuplicatePool(String),
    /// No pool exists for the pair.
    #[error("pool not found for {0}")]
    PoolNotFound(String),
    /// First deposit too small once the minimum liquidity is withheld.
    #[error("insufficient initial liquidity: sqrt(a*b) = {0} does not exceed the minimum liquidity")]
    InsufficientInitialLiquidity(TokenAmount),
    /// Subsequent deposit would mint zero shares.
    #[error("insufficient liquidity minted")]
    InsufficientLiquidityMinted,
    /// Pool reserves cannot satisfy the request.
    #[error("insufficient liquidity in pool")]
    InsufficientLiquidity,
    /// Caller position is smaller than the requested share amount.
    #[error("insufficient shares: requested {requested}, available {available}")]
    InsufficientShares {
        /// Shares asked for.
        requested: TokenAmount,
        /// Shares held.
        available: TokenAmount,
    },
    /// No protocol fees to claim.
    #[error("no protocol fees to claim")]
    NothingToClaim,
    /// Beneficiary already has an active schedule.
    #[error("active schedule already exists for {0}")]
    ScheduleExists(AccountId),
    /// No active schedule for the beneficiary.
    #[error("no active schedule for {0}")]
    NoSchedule(AccountId),
    /// Nothing has vested beyond what was released.
    #[error("nothing to release for {0}")]
    NothingToRelease(AccountId),
    /// Operation blocked by emergency mode.
    #[error("emergency mode is active")]
    EmergencyModeActive,
    /// Operation requires emergency mode.
    #[error("emergency mode is not active")]
    EmergencyModeInactive,
    /// Nested call into an entity that is mid-operation.
    #[error("re-entrant call rejected for {0}")]
    Reentrancy(String),

    /// Actual deposit or withdrawal amounts fell below the caller minimum.
    #[error("slippage exceeded: {side} amount {actual} below minimum {minimum}")]
    SlippageExceeded {
        /// Which side of the pair failed the check.
        side: &'static str,
        /// Amount the operation would move.
        actual: TokenAmount,
        /// Caller-supplied minimum.
        minimum: TokenAmount,
    },
    /// Swap output below the caller minimum.
    #[error("insufficient output: {amount_out} below minimum {min_amount_out}")]
    InsufficientOutput {
        /// Computed output.
        amount_out: TokenAmount,
        /// Caller-supplied minimum.
        min_amount_out: TokenAmount,
    },

    /// Intermediate value does not fit.
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
    /// A ratio has a zero denominator.
    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),

    /// Caller is not the administrator.
    #[error("unauthorized: {0} may not call {1}")]
    Unauthorized(AccountId, &'static str),
    /// Schedule was created as non-revocable.
    #[error("schedule for {0} is not revocable")]
    NotRevocable(AccountId),

    /// The ledger rejected the settlement.
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] LedgerError),
}

impl EngineError {
    /// Maps the error onto its taxonomy class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IdenticalAssets
            | Self::InvalidAsset
            | Self::InvalidFeeRate(..)
            | Self::InvalidAmount(_)
            | Self::InvalidBeneficiary
            | Self::InvalidAccount
            | Self::InvalidDuration(_)
            | Self::InvalidBatch(_) => ErrorKind::Validation,
            Self::DuplicatePool(_)
            | Self::PoolNotFound(_)
            | Self::InsufficientInitialLiquidity(_)
            | Self::InsufficientLiquidityMinted
            | Self::InsufficientLiquidity
            | Self::InsufficientShares { .. }
            | Self::NothingToClaim
            | Self::ScheduleExists(_)
            | Self::NoSchedule(_)
            | Self::NothingToRelease(_)
            | Self::EmergencyModeActive
            | Self::EmergencyModeInactive
            | Self::Reentrancy(_) => ErrorKind::StateConflict,
            Self::SlippageExceeded { .. } | Self::InsufficientOutput { .. } => ErrorKind::Slippage,
            Self::ArithmeticOverflow(_) | Self::DivisionByZero(_) => ErrorKind::Arithmetic,
            Self::Unauthorized(..) | Self::NotRevocable(_) => ErrorKind::Authorization,
            Self::TransferFailed(_) => ErrorKind::ExternalTransfer,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Variable present but unparsable.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Environment variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
    /// Value parsed but outside the accepted range.
    #[error("{0}")]
    OutOfRange(String),
}
