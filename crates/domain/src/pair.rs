//! Canonical identity of an unordered asset pair.

use crate::error::EngineError;
use crate::token::AssetId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pair key with `asset_a < asset_b` (lexicographic on the identifier).
///
/// `(A, B)` and `(B, A)` always resolve to the same key, so a pool can
/// never be registered twice under opposite orderings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    asset_a: AssetId,
    asset_b: AssetId,
}

/// A pair key plus the orientation of the caller's arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrientedPair {
    pub key: PairKey,
    /// `true` when the caller's first asset is the key's `asset_b`.
    pub flipped: bool,
}

impl PairKey {
    /// Canonicalizes two asset identifiers.
    ///
    /// # Errors
    /// `InvalidAsset` for a null identifier, `IdenticalAssets` when both match.
    pub fn new(first: &AssetId, second: &AssetId) -> Result<Self, EngineError> {
        Self::oriented(first, second).map(|o| o.key)
    }

    /// Canonicalizes and remembers which argument landed on which side.
    pub fn oriented(first: &AssetId, second: &AssetId) -> Result<OrientedPair, EngineError> {
        if first.is_null() || second.is_null() {
            return Err(EngineError::InvalidAsset);
        }
        if first == second {
            return Err(EngineError::IdenticalAssets);
        }
        let flipped = first > second;
        let (asset_a, asset_b) = if flipped {
            (second.clone(), first.clone())
        } else {
            (first.clone(), second.clone())
        };
        Ok(OrientedPair {
            key: Self { asset_a, asset_b },
            flipped,
        })
    }

    pub fn asset_a(&self) -> &AssetId {
        &self.asset_a
    }

    pub fn asset_b(&self) -> &AssetId {
        &self.asset_b
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        &self.asset_a == asset || &self.asset_b == asset
    }
}

impl OrientedPair {
    /// Reorders a `(first, second)` tuple given in caller order into canonical order.
    pub fn to_canonical<T>(&self, first: T, second: T) -> (T, T) {
        if self.flipped {
            (second, first)
        } else {
            (first, second)
        }
    }

    /// Reorders a canonical `(a, b)` tuple back into caller order.
    pub fn to_caller<T>(&self, a: T, b: T) -> (T, T) {
        self.to_canonical(a, b)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asset_a, self.asset_b)
    }
}
