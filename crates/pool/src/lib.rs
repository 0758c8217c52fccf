//! Constant-product liquidity pools.
//!
//! This crate provides:
//! - One pool per unordered asset pair, keyed by a canonical pair
//! - Share-based liquidity deposits and withdrawals
//! - Fee-on-input swaps with a protocol fee share and claim watermark
//! - Side-effect free quotes with price impact

/// Prelude module for convenient imports.
pub mod prelude;

/// Pool engine.
pub mod engine;
/// Swap quotes.
pub mod quote;
/// Pool and position records.
pub mod state;
