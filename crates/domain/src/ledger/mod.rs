//! Fungible-asset ledger consumed by the engines.
//!
//! The ledger is an external collaborator: the engines never hold balances
//! themselves, they only move funds between caller accounts and their own
//! custody account through this trait.
//!
//! Every engine operation issues exactly one [`Ledger::settle`] call carrying
//! all of its legs, so a multi-asset operation either moves everything or
//! nothing.

mod memory;

pub use memory::InMemoryLedger;

use crate::error::LedgerError;
use crate::token::{AccountId, AssetId, TokenAmount};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One leg of a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transfer {
    /// Allowance-based move: `spender` moves `from`'s funds to `to`.
    Pull {
        asset: AssetId,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: TokenAmount,
    },
    /// Direct move out of an account controlled by the caller.
    Push {
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: TokenAmount,
    },
}

impl Transfer {
    pub fn asset(&self) -> &AssetId {
        match self {
            Self::Pull { asset, .. } | Self::Push { asset, .. } => asset,
        }
    }

    pub fn amount(&self) -> TokenAmount {
        match self {
            Self::Pull { amount, .. } | Self::Push { amount, .. } => *amount,
        }
    }
}

/// Balance query and atomic transfers.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balance of `account` in `asset`.
    async fn balance_of(&self, asset: &AssetId, account: &AccountId) -> TokenAmount;

    /// Applies every leg or none of them.
    ///
    /// # Errors
    /// Any [`LedgerError`]; the ledger is left unchanged when an error is returned.
    async fn settle(&self, transfers: &[Transfer]) -> Result<(), LedgerError>;

    /// Moves `amount` from `from` to `to` using `spender`'s allowance.
    async fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        self.settle(&[Transfer::Pull {
            asset: asset.clone(),
            spender: spender.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        }])
        .await
    }

    /// Moves `amount` out of an account the caller controls.
    async fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        self.settle(&[Transfer::Push {
            asset: asset.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        }])
        .await
    }
}
