//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use basecore_domain::prelude::*;
//! ```

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{EngineConfig, PoolConfig, VestingConfig};
pub use crate::error::{ConfigError, EngineError, ErrorKind, LedgerError};
pub use crate::events::{EngineEvent, EngineEventType, EventData, EventLog};
pub use crate::fees::{FeeAccumulation, FeeSplit, MAX_FEE_RATE_BPS, MAX_PROTOCOL_FEE_SHARE_BPS};
pub use crate::guard::{EntityKey, ensure_not_entered, exclusive};
pub use crate::ledger::{InMemoryLedger, Ledger, Transfer};
pub use crate::pair::{OrientedPair, PairKey};
pub use crate::token::{AccountId, AssetId, TokenAmount};
pub use crate::value_objects::Percentage;
