//! Constant-product pool engine.

use crate::quote::{SwapQuote, quote_swap};
use crate::state::{LiquidityPosition, LiquidityReceipt, MINIMUM_LIQUIDITY, Pool, PoolBook};
use basecore_domain::clock::Clock;
use basecore_domain::config::PoolConfig;
use basecore_domain::error::{ConfigError, EngineError};
use basecore_domain::events::{EventData, EventLog};
use basecore_domain::fees::{MAX_FEE_RATE_BPS, MAX_PROTOCOL_FEE_SHARE_BPS};
use basecore_domain::guard::{EntityKey, ensure_not_entered, exclusive};
use basecore_domain::ledger::{Ledger, Transfer};
use basecore_domain::math::constant_product::{
    calculate_k, initial_shares, proportional_shares, quote_counterpart, withdrawal_amount,
};
use basecore_domain::pair::PairKey;
use basecore_domain::token::{AccountId, AssetId, TokenAmount};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Result of an executed swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub pair: PairKey,
    pub asset_in: AssetId,
    pub quote: SwapQuote,
}

impl SwapReceipt {
    pub fn amount_out(&self) -> TokenAmount {
        self.quote.amount_out
    }
}

/// Owns every pool, keyed by canonical pair.
///
/// Each pool sits behind its own mutex: operations on distinct pairs run
/// concurrently, operations on the same pair serialise. Every mutating call
/// validates and computes under the lock, settles all ledger legs in one
/// call, and only then commits, so a failed settlement changes nothing.
pub struct PoolEngine<L: Ledger + ?Sized> {
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    /// Account holding reserves and accrued protocol fees.
    custody: AccountId,
    config: RwLock<PoolConfig>,
    pools: RwLock<HashMap<PairKey, Arc<Mutex<PoolBook>>>>,
    events: Arc<EventLog>,
}

impl<L: Ledger + ?Sized> PoolEngine<L> {
    /// Creates an engine with its own event log.
    ///
    /// # Errors
    /// Returns an error if `config` is out of range or `custody` is null.
    pub fn new(
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
        config: PoolConfig,
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
            pools: RwLock::new(HashMap::new()),
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

    /// Snapshot of the live configuration.
    pub async fn config(&self) -> PoolConfig {
        self.config.read().await.clone()
    }

    /// All registered pairs, sorted.
    pub async fn pairs(&self) -> Vec<PairKey> {
        let mut pairs: Vec<PairKey> = self.pools.read().await.keys().cloned().collect();
        pairs.sort();
        pairs
    }

    // Admin

    /// Registers an empty pool; a fee rate of zero selects the configured default.
    pub async fn create_pool(
        &self,
        caller: &AccountId,
        asset_a: &AssetId,
        asset_b: &AssetId,
        fee_rate_bps: u32,
    ) -> Result<PairKey, EngineError> {
        self.require_admin(caller, "create_pool").await?;
        if fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(EngineError::InvalidFeeRate(fee_rate_bps, MAX_FEE_RATE_BPS));
        }
        let key = PairKey::new(asset_a, asset_b)?;
        let fee_rate_bps = if fee_rate_bps == 0 {
            self.config.read().await.default_fee_rate_bps
        } else {
            fee_rate_bps
        };

        let now = self.clock.now();
        {
            let mut pools = self.pools.write().await;
            if pools.contains_key(&key) {
                return Err(EngineError::DuplicatePool(key.to_string()));
            }
            pools.insert(
                key.clone(),
                Arc::new(Mutex::new(PoolBook::new(Pool::new(
                    key.clone(),
                    fee_rate_bps,
                    now,
                )))),
            );
        }

        info!(pair = %key, fee_rate_bps, "Pool created");
        self.events
            .record(
                now,
                EventData::PoolCreated {
                    pair: key.clone(),
                    fee_rate_bps,
                },
            )
            .await;
        Ok(key)
    }

    pub async fn set_default_fee_rate(
        &self,
        caller: &AccountId,
        fee_rate_bps: u32,
    ) -> Result<(), EngineError> {
        self.require_admin(caller, "set_default_fee_rate").await?;
        if fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(EngineError::InvalidFeeRate(fee_rate_bps, MAX_FEE_RATE_BPS));
        }
        let old_bps = {
            let mut config = self.config.write().await;
            std::mem::replace(&mut config.default_fee_rate_bps, fee_rate_bps)
        };
        info!(old_bps, new_bps = fee_rate_bps, "Default fee rate updated");
        self.events
            .record(
                self.clock.now(),
                EventData::FeeRateUpdated {
                    pair: None,
                    old_bps,
                    new_bps: fee_rate_bps,
                },
            )
            .await;
        Ok(())
    }

    /// Share of each swap fee diverted to the fee recipient.
    pub async fn set_protocol_fee_share(
        &self,
        caller: &AccountId,
        share_bps: u32,
    ) -> Result<(), EngineError> {
        self.require_admin(caller, "set_protocol_fee_share").await?;
        if share_bps > MAX_PROTOCOL_FEE_SHARE_BPS {
            return Err(EngineError::InvalidFeeRate(
                share_bps,
                MAX_PROTOCOL_FEE_SHARE_BPS,
            ));
        }
        self.config.write().await.protocol_fee_share_bps = share_bps;
        info!(share_bps, "Protocol fee share updated");
        Ok(())
    }

    pub async fn set_fee_recipient(
        &self,
        caller: &AccountId,
        recipient: &AccountId,
    ) -> Result<(), EngineError> {
        self.require_admin(caller, "set_fee_recipient").await?;
        if recipient.is_null() {
            return Err(EngineError::InvalidAccount);
        }
        self.config.write().await.fee_recipient = recipient.clone();
        info!(recipient = %recipient, "Fee recipient updated");
        Ok(())
    }

    /// Overrides the fee rate of one existing pool.
    pub async fn set_pool_fee_rate(
        &self,
        caller: &AccountId,
        asset_a: &AssetId,
        asset_b: &AssetId,
        fee_rate_bps: u32,
    ) -> Result<(), EngineError> {
        self.require_admin(caller, "set_pool_fee_rate").await?;
        if fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(EngineError::InvalidFeeRate(fee_rate_bps, MAX_FEE_RATE_BPS));
        }
        let key = PairKey::new(asset_a, asset_b)?;
        let book = self.book(&key).await?;

        exclusive(vec![EntityKey::Pair(key.clone())], async {
            let old_bps = {
                let mut book = book.lock().await;
                std::mem::replace(&mut book.pool.fee_rate_bps, fee_rate_bps)
            };
            info!(pair = %key, old_bps, new_bps = fee_rate_bps, "Pool fee rate updated");
            self.events
                .record(
                    self.clock.now(),
                    EventData::FeeRateUpdated {
                        pair: Some(key.clone()),
                        old_bps,
                        new_bps: fee_rate_bps,
                    },
                )
                .await;
            Ok(())
        })
        .await
    }

    // Liquidity

    /// Deposits both assets and mints shares to `caller`.
    ///
    /// The first deposit into an empty pool mints `floor(sqrt(a * b))` minus
    /// [`MINIMUM_LIQUIDITY`]. Later deposits only pull the amounts matching
    /// the current reserve ratio; those actual amounts are checked against
    /// the caller's minimums.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_liquidity(
        &self,
        caller: &AccountId,
        asset_a: &AssetId,
        asset_b: &AssetId,
        amount_a: TokenAmount,
        amount_b: TokenAmount,
        min_amount_a: TokenAmount,
        min_amount_b: TokenAmount,
    ) -> Result<LiquidityReceipt, EngineError> {
        if caller.is_null() {
            return Err(EngineError::InvalidAccount);
        }
        if amount_a.is_zero() || amount_b.is_zero() {
            return Err(EngineError::InvalidAmount("deposit amounts must be positive"));
        }
        let oriented = PairKey::oriented(asset_a, asset_b)?;
        let key = oriented.key.clone();
        let book = self.book(&key).await?;

        exclusive(vec![EntityKey::Pair(key.clone())], async {
            let mut book = book.lock().await;
            let (desired_a, desired_b) = oriented.to_canonical(amount_a, amount_b);
            let pool = &book.pool;

            let (actual_a, actual_b, minted) = if pool.total_shares.is_zero() {
                let minted = initial_shares(
                    desired_a,
                    desired_b,
                    TokenAmount::from(MINIMUM_LIQUIDITY),
                )?;
                (desired_a, desired_b, minted)
            } else {
                let (actual_a, actual_b) =
                    optimal_amounts(desired_a, desired_b, pool.reserve_a, pool.reserve_b)?;
                let minted = proportional_shares(
                    actual_a,
                    actual_b,
                    pool.reserve_a,
                    pool.reserve_b,
                    pool.total_shares,
                )?;
                (actual_a, actual_b, minted)
            };

            let (actual_first, actual_second) = oriented.to_caller(actual_a, actual_b);
            check_minimum("amount_a", actual_first, min_amount_a)?;
            check_minimum("amount_b", actual_second, min_amount_b)?;
            if minted.is_zero() {
                return Err(EngineError::InsufficientLiquidityMinted);
            }

            let reserve_a = pool.reserve_a.checked_add(actual_a)?;
            let reserve_b = pool.reserve_b.checked_add(actual_b)?;
            let total_shares = pool.total_shares.checked_add(minted)?;
            let shares = book.shares_of(caller).checked_add(minted)?;

            self.settle(
                &key,
                "add_liquidity",
                vec![
                    self.pull(key.asset_a(), caller, actual_a),
                    self.pull(key.asset_b(), caller, actual_b),
                ],
            )
            .await?;

            let now = self.clock.now();
            book.pool.reserve_a = reserve_a;
            book.pool.reserve_b = reserve_b;
            book.pool.total_shares = total_shares;
            book.set_shares(caller, shares, now);

            info!(
                pair = %key,
                provider = %caller,
                amount_a = %actual_a,
                amount_b = %actual_b,
                shares = %minted,
                "Liquidity added"
            );
            self.events
                .record(
                    now,
                    EventData::LiquidityAdded {
                        pair: key.clone(),
                        provider: caller.clone(),
                        amount_a: actual_a,
                        amount_b: actual_b,
                        shares: minted,
                    },
                )
                .await;

            Ok(LiquidityReceipt {
                pair: key.clone(),
                amount_a: actual_first,
                amount_b: actual_second,
                shares: minted,
            })
        })
        .await
    }

    /// Burns `shares` of `caller`'s position and pays out the proportional reserves.
    ///
    /// Both payouts round down, so the remainder always stays in the pool.
    #[allow(clippy::too_many_arguments)]
    pub async fn remove_liquidity(
        &self,
        caller: &AccountId,
        asset_a: &AssetId,
        asset_b: &AssetId,
        shares: TokenAmount,
        min_amount_a: TokenAmount,
        min_amount_b: TokenAmount,
    ) -> Result<LiquidityReceipt, EngineError> {
        if shares.is_zero() {
            return Err(EngineError::InvalidAmount("share amount must be positive"));
        }
        let oriented = PairKey::oriented(asset_a, asset_b)?;
        let key = oriented.key.clone();
        let book = self.book(&key).await?;

        exclusive(vec![EntityKey::Pair(key.clone())], async {
            let mut book = book.lock().await;
            let held = book.shares_of(caller);
            if held < shares {
                return Err(EngineError::InsufficientShares {
                    requested: shares,
                    available: held,
                });
            }

            let pool = &book.pool;
            let amount_a = withdrawal_amount(shares, pool.reserve_a, pool.total_shares)?;
            let amount_b = withdrawal_amount(shares, pool.reserve_b, pool.total_shares)?;

            let (out_first, out_second) = oriented.to_caller(amount_a, amount_b);
            check_minimum("amount_a", out_first, min_amount_a)?;
            check_minimum("amount_b", out_second, min_amount_b)?;
            if amount_a.is_zero() || amount_b.is_zero() {
                return Err(EngineError::InsufficientLiquidity);
            }

            let reserve_a = pool.reserve_a.checked_sub(amount_a)?;
            let reserve_b = pool.reserve_b.checked_sub(amount_b)?;
            let total_shares = pool.total_shares.checked_sub(shares)?;
            let remaining = held.checked_sub(shares)?;

            self.settle(
                &key,
                "remove_liquidity",
                vec![
                    self.push(key.asset_a(), caller, amount_a),
                    self.push(key.asset_b(), caller, amount_b),
                ],
            )
            .await?;

            let now = self.clock.now();
            book.pool.reserve_a = reserve_a;
            book.pool.reserve_b = reserve_b;
            book.pool.total_shares = total_shares;
            book.set_shares(caller, remaining, now);

            info!(
                pair = %key,
                provider = %caller,
                amount_a = %amount_a,
                amount_b = %amount_b,
                shares = %shares,
                "Liquidity removed"
            );
            self.events
                .record(
                    now,
                    EventData::LiquidityRemoved {
                        pair: key.clone(),
                        provider: caller.clone(),
                        amount_a,
                        amount_b,
                        shares,
                    },
                )
                .await;

            Ok(LiquidityReceipt {
                pair: key.clone(),
                amount_a: out_first,
                amount_b: out_second,
                shares,
            })
        })
        .await
    }

    // Swaps

    /// Sells `amount_in` of `asset_in` for `asset_out`.
    pub async fn swap(
        &self,
        caller: &AccountId,
        asset_in: &AssetId,
        asset_out: &AssetId,
        amount_in: TokenAmount,
        min_amount_out: TokenAmount,
    ) -> Result<SwapReceipt, EngineError> {
        if caller.is_null() {
            return Err(EngineError::InvalidAccount);
        }
        if amount_in.is_zero() {
            return Err(EngineError::InvalidAmount("swap input must be positive"));
        }
        let oriented = PairKey::oriented(asset_in, asset_out)?;
        let key = oriented.key.clone();
        let book = self.book(&key).await?;
        let protocol_share = self.config.read().await.protocol_fee_share_bps;

        exclusive(vec![EntityKey::Pair(key.clone())], async {
            let mut book = book.lock().await;
            let a_to_b = !oriented.flipped;
            let (reserve_in, reserve_out) = book.pool.reserves_for(a_to_b);
            let quote = quote_swap(
                reserve_in,
                reserve_out,
                amount_in,
                book.pool.fee_rate_bps,
                protocol_share,
            )?;

            if quote.amount_out.is_zero() || quote.amount_out < min_amount_out {
                return Err(EngineError::InsufficientOutput {
                    amount_out: quote.amount_out,
                    min_amount_out,
                });
            }
            debug_assert!(
                calculate_k(quote.new_reserve_in, quote.new_reserve_out)
                    >= calculate_k(reserve_in, reserve_out)
            );

            let mut fees = book.fees;
            if a_to_b {
                fees.accrued_a = fees.accrued_a.checked_add(quote.fee.protocol)?;
            } else {
                fees.accrued_b = fees.accrued_b.checked_add(quote.fee.protocol)?;
            }

            self.settle(
                &key,
                "swap",
                vec![
                    self.pull(asset_in, caller, amount_in),
                    self.push(asset_out, caller, quote.amount_out),
                ],
            )
            .await?;

            if a_to_b {
                book.pool.reserve_a = quote.new_reserve_in;
                book.pool.reserve_b = quote.new_reserve_out;
            } else {
                book.pool.reserve_b = quote.new_reserve_in;
                book.pool.reserve_a = quote.new_reserve_out;
            }
            book.fees = fees;

            info!(
                pair = %key,
                trader = %caller,
                asset_in = %asset_in,
                amount_in = %amount_in,
                amount_out = %quote.amount_out,
                protocol_fee = %quote.fee.protocol,
                "Swap executed"
            );
            self.events
                .record(
                    self.clock.now(),
                    EventData::Swapped {
                        pair: key.clone(),
                        trader: caller.clone(),
                        asset_in: asset_in.clone(),
                        amount_in,
                        amount_out: quote.amount_out,
                        protocol_fee: quote.fee.protocol,
                    },
                )
                .await;

            Ok(SwapReceipt {
                pair: key.clone(),
                asset_in: asset_in.clone(),
                quote,
            })
        })
        .await
    }

    /// Output of a swap at current reserves, without executing it.
    pub async fn get_amount_out(
        &self,
        asset_in: &AssetId,
        asset_out: &AssetId,
        amount_in: TokenAmount,
    ) -> Result<TokenAmount, EngineError> {
        self.get_quote(asset_in, asset_out, amount_in)
            .await
            .map(|q| q.amount_out)
    }

    /// Full quote at current reserves, including fees and price impact.
    pub async fn get_quote(
        &self,
        asset_in: &AssetId,
        asset_out: &AssetId,
        amount_in: TokenAmount,
    ) -> Result<SwapQuote, EngineError> {
        if amount_in.is_zero() {
            return Err(EngineError::InvalidAmount("swap input must be positive"));
        }
        let oriented = PairKey::oriented(asset_in, asset_out)?;
        let pool = self.read_pool(&oriented.key).await?;
        let protocol_share = self.config.read().await.protocol_fee_share_bps;
        let (reserve_in, reserve_out) = pool.reserves_for(!oriented.flipped);
        let quote = quote_swap(
            reserve_in,
            reserve_out,
            amount_in,
            pool.fee_rate_bps,
            protocol_share,
        )?;
        debug!(
            pair = %oriented.key,
            amount_in = %amount_in,
            amount_out = %quote.amount_out,
            price_impact = %quote.price_impact,
            "Quote computed"
        );
        Ok(quote)
    }

    // Queries

    /// Reserves, share supply and fee rate, in canonical order.
    pub async fn get_pool_info(
        &self,
        asset_a: &AssetId,
        asset_b: &AssetId,
    ) -> Result<Pool, EngineError> {
        let key = PairKey::new(asset_a, asset_b)?;
        self.read_pool(&key).await
    }

    pub async fn get_liquidity_position(
        &self,
        owner: &AccountId,
        asset_a: &AssetId,
        asset_b: &AssetId,
    ) -> Result<LiquidityPosition, EngineError> {
        let key = PairKey::new(asset_a, asset_b)?;
        let book = self.read_book(&key).await?;
        let book = book.lock().await;
        Ok(book.position_of(owner))
    }

    /// Every recorded position of a pool, including emptied ones.
    pub async fn get_positions(
        &self,
        asset_a: &AssetId,
        asset_b: &AssetId,
    ) -> Result<Vec<LiquidityPosition>, EngineError> {
        let key = PairKey::new(asset_a, asset_b)?;
        let book = self.read_book(&key).await?;
        let book = book.lock().await;
        let mut positions: Vec<LiquidityPosition> = book.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.owner.cmp(&b.owner));
        Ok(positions)
    }

    // Protocol fees

    /// Claimable protocol fees as `(asset_a, asset_b)` in canonical order.
    pub async fn get_protocol_fees(
        &self,
        asset_a: &AssetId,
        asset_b: &AssetId,
    ) -> Result<(TokenAmount, TokenAmount), EngineError> {
        let key = PairKey::new(asset_a, asset_b)?;
        let book = self.read_book(&key).await?;
        let book = book.lock().await;
        Ok(book.fees.claimable())
    }

    /// Pays all unclaimed protocol fees of a pool to the fee recipient.
    ///
    /// Claims advance a per-pool watermark, so the same accrual can never be
    /// paid twice. Returns the amounts paid in canonical order.
    pub async fn claim_fees(
        &self,
        caller: &AccountId,
        asset_a: &AssetId,
        asset_b: &AssetId,
    ) -> Result<(TokenAmount, TokenAmount), EngineError> {
        let recipient = {
            let config = self.config.read().await;
            if caller != &config.admin && caller != &config.fee_recipient {
                warn!(caller = %caller, "Rejected fee claim from unauthorized caller");
                return Err(EngineError::Unauthorized(caller.clone(), "claim_fees"));
            }
            config.fee_recipient.clone()
        };
        let key = PairKey::new(asset_a, asset_b)?;
        let book = self.book(&key).await?;

        exclusive(vec![EntityKey::Pair(key.clone())], async {
            let mut book = book.lock().await;
            let (claim_a, claim_b) = book.fees.claimable();
            if claim_a.is_zero() && claim_b.is_zero() {
                return Err(EngineError::NothingToClaim);
            }

            let mut fees = book.fees;
            fees.claimed_a = fees.claimed_a.checked_add(claim_a)?;
            fees.claimed_b = fees.claimed_b.checked_add(claim_b)?;

            let legs = [
                (key.asset_a(), claim_a),
                (key.asset_b(), claim_b),
            ]
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(asset, amount)| self.push(asset, &recipient, amount))
            .collect();
            self.settle(&key, "claim_fees", legs).await?;

            book.fees = fees;

            info!(
                pair = %key,
                recipient = %recipient,
                amount_a = %claim_a,
                amount_b = %claim_b,
                "Protocol fees claimed"
            );
            self.events
                .record(
                    self.clock.now(),
                    EventData::ProtocolFeesClaimed {
                        pair: key.clone(),
                        recipient: recipient.clone(),
                        amount_a: claim_a,
                        amount_b: claim_b,
                    },
                )
                .await;
            Ok((claim_a, claim_b))
        })
        .await
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

    async fn book(&self, key: &PairKey) -> Result<Arc<Mutex<PoolBook>>, EngineError> {
        self.pools
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::PoolNotFound(key.to_string()))
    }

    /// Book lookup for queries; fails instead of waiting on a pool this task holds.
    async fn read_book(&self, key: &PairKey) -> Result<Arc<Mutex<PoolBook>>, EngineError> {
        ensure_not_entered(&EntityKey::Pair(key.clone()))?;
        self.book(key).await
    }

    async fn read_pool(&self, key: &PairKey) -> Result<Pool, EngineError> {
        let book = self.read_book(key).await?;
        let pool = book.lock().await.pool.clone();
        Ok(pool)
    }

    fn pull(&self, asset: &AssetId, from: &AccountId, amount: TokenAmount) -> Transfer {
        Transfer::Pull {
            asset: asset.clone(),
            spender: self.custody.clone(),
            from: from.clone(),
            to: self.custody.clone(),
            amount,
        }
    }

    fn push(&self, asset: &AssetId, to: &AccountId, amount: TokenAmount) -> Transfer {
        Transfer::Push {
            asset: asset.clone(),
            from: self.custody.clone(),
            to: to.clone(),
            amount,
        }
    }

    async fn settle(
        &self,
        key: &PairKey,
        operation: &'static str,
        legs: Vec<Transfer>,
    ) -> Result<(), EngineError> {
        self.ledger.settle(&legs).await.map_err(|e| {
            error!(pair = %key, operation, error = %e, "Settlement failed");
            EngineError::from(e)
        })
    }
}

/// Amounts matching the reserve ratio, never above what the caller offered.
fn optimal_amounts(
    desired_a: TokenAmount,
    desired_b: TokenAmount,
    reserve_a: TokenAmount,
    reserve_b: TokenAmount,
) -> Result<(TokenAmount, TokenAmount), EngineError> {
    let b_optimal = quote_counterpart(desired_a, reserve_a, reserve_b)?;
    if b_optimal <= desired_b {
        return Ok((desired_a, b_optimal));
    }
    let a_optimal = quote_counterpart(desired_b, reserve_b, reserve_a)?;
    Ok((a_optimal.min(desired_a), desired_b))
}

fn check_minimum(
    side: &'static str,
    actual: TokenAmount,
    minimum: TokenAmount,
) -> Result<(), EngineError> {
    if actual < minimum {
        return Err(EngineError::SlippageExceeded {
            side,
            actual,
            minimum,
        });
    }
    Ok(())
}

impl<L: Ledger + ?Sized> std::fmt::Debug for PoolEngine<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolEngine")
            .field("custody", &self.custody)
            .finish_non_exhaustive()
    }
}
