//! Pool and position records.

use basecore_domain::fees::FeeAccumulation;
use basecore_domain::pair::PairKey;
use basecore_domain::token::{AccountId, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum liquidity withheld from the first deposit of an empty pool.
pub const MINIMUM_LIQUIDITY: u64 = 100;

/// One trading pair's reserves and share supply, in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Canonical pair.
    pub pair: PairKey,
    /// Reserve of `pair.asset_a()`.
    pub reserve_a: TokenAmount,
    /// Reserve of `pair.asset_b()`.
    pub reserve_b: TokenAmount,
    /// Sum of all provider shares.
    pub total_shares: TokenAmount,
    /// Swap fee in basis points.
    pub fee_rate_bps: u32,
    /// Engine time the pool was registered.
    pub created_at: u64,
}

impl Pool {
    pub(crate) fn new(pair: PairKey, fee_rate_bps: u32, created_at: u64) -> Self {
        Self {
            pair,
            reserve_a: TokenAmount::zero(),
            reserve_b: TokenAmount::zero(),
            total_shares: TokenAmount::zero(),
            fee_rate_bps,
            created_at,
        }
    }

    /// Reserves ordered as `(in, out)` for a swap.
    pub fn reserves_for(&self, a_to_b: bool) -> (TokenAmount, TokenAmount) {
        if a_to_b {
            (self.reserve_a, self.reserve_b)
        } else {
            (self.reserve_b, self.reserve_a)
        }
    }
}

/// One provider's claim on one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub owner: AccountId,
    pub pair: PairKey,
    pub shares: TokenAmount,
    /// Engine time of the last deposit or withdrawal.
    pub last_update: u64,
}

/// Everything the engine stores for one pair, guarded by a single lock.
#[derive(Debug)]
pub(crate) struct PoolBook {
    pub pool: Pool,
    pub positions: HashMap<AccountId, LiquidityPosition>,
    pub fees: FeeAccumulation,
}

impl PoolBook {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            positions: HashMap::new(),
            fees: FeeAccumulation::default(),
        }
    }

    pub fn shares_of(&self, owner: &AccountId) -> TokenAmount {
        self.positions
            .get(owner)
            .map(|p| p.shares)
            .unwrap_or_default()
    }

    pub fn position_of(&self, owner: &AccountId) -> LiquidityPosition {
        self.positions
            .get(owner)
            .cloned()
            .unwrap_or_else(|| LiquidityPosition {
                owner: owner.clone(),
                pair: self.pool.pair.clone(),
                shares: TokenAmount::zero(),
                last_update: 0,
            })
    }

    /// Sets `owner`'s share balance, keeping the record even at zero.
    pub fn set_shares(&mut self, owner: &AccountId, shares: TokenAmount, now: u64) {
        let pair = self.pool.pair.clone();
        let position = self
            .positions
            .entry(owner.clone())
            .or_insert_with(|| LiquidityPosition {
                owner: owner.clone(),
                pair,
                shares: TokenAmount::zero(),
                last_update: now,
            });
        position.shares = shares;
        position.last_update = now;
    }
}

/// Result of a deposit or withdrawal, amounts in the caller's argument order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityReceipt {
    pub pair: PairKey,
    /// Amount of the first asset argument moved.
    pub amount_a: TokenAmount,
    /// Amount of the second asset argument moved.
    pub amount_b: TokenAmount,
    /// Shares minted or burned.
    pub shares: TokenAmount,
}
