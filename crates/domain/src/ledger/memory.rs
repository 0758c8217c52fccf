//! In-memory reference ledger.

use super::{Ledger, Transfer};
use crate::error::LedgerError;
use crate::token::{AccountId, AssetId, TokenAmount};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

type BalanceKey = (AssetId, AccountId);
type AllowanceKey = (AssetId, AccountId, AccountId);

/// Ledger backed by hash maps, with a switch to force settlement failures.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// Balances by (asset, account).
    balances: RwLock<HashMap<BalanceKey, TokenAmount>>,
    /// Allowances by (asset, owner, spender).
    allowances: RwLock<HashMap<AllowanceKey, TokenAmount>>,
    /// When set, every settlement is rejected.
    fail_settlements: AtomicBool,
    /// Number of successful settlements.
    settlements: AtomicU64,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `account` out of thin air.
    pub async fn mint(&self, asset: &AssetId, account: &AccountId, amount: TokenAmount) {
        let mut balances = self.balances.write().await;
        let entry = balances
            .entry((asset.clone(), account.clone()))
            .or_insert_with(TokenAmount::zero);
        *entry = TokenAmount(entry.0.saturating_add(amount.0));
    }

    /// Sets the allowance `owner` grants to `spender`.
    pub async fn approve(
        &self,
        asset: &AssetId,
        owner: &AccountId,
        spender: &AccountId,
        amount: TokenAmount,
    ) {
        self.allowances
            .write()
            .await
            .insert((asset.clone(), owner.clone(), spender.clone()), amount);
    }

    /// Remaining allowance from `owner` to `spender`.
    pub async fn allowance(
        &self,
        asset: &AssetId,
        owner: &AccountId,
        spender: &AccountId,
    ) -> TokenAmount {
        self.allowances
            .read()
            .await
            .get(&(asset.clone(), owner.clone(), spender.clone()))
            .copied()
            .unwrap_or_default()
    }

    /// Forces every subsequent settlement to fail (or succeed again).
    pub fn set_fail_settlements(&self, fail: bool) {
        self.fail_settlements.store(fail, Ordering::SeqCst);
    }

    /// Number of settlements applied so far.
    pub fn settlement_count(&self) -> u64 {
        self.settlements.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn balance_of(&self, asset: &AssetId, account: &AccountId) -> TokenAmount {
        self.balances
            .read()
            .await
            .get(&(asset.clone(), account.clone()))
            .copied()
            .unwrap_or_default()
    }

    async fn settle(&self, transfers: &[Transfer]) -> Result<(), LedgerError> {
        if self.fail_settlements.load(Ordering::SeqCst) {
            warn!(legs = transfers.len(), "Settlement rejected by failure switch");
            return Err(LedgerError::Rejected("ledger unavailable".to_string()));
        }

        let mut balances = self.balances.write().await;
        let mut allowances = self.allowances.write().await;

        // Stage every touched entry, commit only when all legs pass.
        let mut staged_balances: HashMap<BalanceKey, TokenAmount> = HashMap::new();
        let mut staged_allowances: HashMap<AllowanceKey, TokenAmount> = HashMap::new();

        for transfer in transfers {
            let (asset, from, to, amount) = match transfer {
                Transfer::Pull {
                    asset,
                    spender,
                    from,
                    to,
                    amount,
                } => {
                    let key = (asset.clone(), from.clone(), spender.clone());
                    let current = staged_allowances
                        .get(&key)
                        .or_else(|| allowances.get(&key))
                        .copied()
                        .unwrap_or_default();
                    let remaining = current.0.checked_sub(amount.0).ok_or_else(|| {
                        LedgerError::InsufficientAllowance {
                            asset: asset.to_string(),
                            owner: from.clone(),
                            spender: spender.clone(),
                        }
                    })?;
                    staged_allowances.insert(key, TokenAmount(remaining));
                    (asset, from, to, *amount)
                }
                Transfer::Push {
                    asset,
                    from,
                    to,
                    amount,
                } => (asset, from, to, *amount),
            };

            let from_key = (asset.clone(), from.clone());
            let available = staged_balances
                .get(&from_key)
                .or_else(|| balances.get(&from_key))
                .copied()
                .unwrap_or_default();
            let debited =
                available
                    .0
                    .checked_sub(amount.0)
                    .ok_or_else(|| LedgerError::InsufficientBalance {
                        asset: asset.to_string(),
                        account: from.clone(),
                        available,
                        required: amount,
                    })?;
            staged_balances.insert(from_key, TokenAmount(debited));

            let to_key = (asset.clone(), to.clone());
            let current = staged_balances
                .get(&to_key)
                .or_else(|| balances.get(&to_key))
                .copied()
                .unwrap_or_default();
            let credited = current.0.checked_add(amount.0).ok_or(LedgerError::Overflow)?;
            staged_balances.insert(to_key, TokenAmount(credited));
        }

        balances.extend(staged_balances);
        allowances.extend(staged_allowances);
        self.settlements.fetch_add(1, Ordering::SeqCst);
        debug!(legs = transfers.len(), "Settlement applied");
        Ok(())
    }
}
