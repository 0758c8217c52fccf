//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use basecore_pool::prelude::*;
//! ```

pub use crate::engine::{PoolEngine, SwapReceipt};
pub use crate::quote::{SwapQuote, quote_swap};
pub use crate::state::{LiquidityPosition, LiquidityReceipt, MINIMUM_LIQUIDITY, Pool};
