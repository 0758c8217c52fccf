//! Shared building blocks for the pool and vesting engines.
//!
//! This crate provides:
//! - Asset and account identifiers and 256-bit token amounts
//! - Checked fixed-point and constant-product math
//! - The error taxonomy used by every engine entry point
//! - The ledger and clock seams, with in-memory implementations
//! - A task-local re-entrancy guard
//! - Engine events and configuration

/// Prelude module for convenient imports.
pub mod prelude;

/// Time source.
pub mod clock;
/// Engine configuration.
pub mod config;
/// Error taxonomy.
pub mod error;
/// Engine events.
pub mod events;
/// Swap fee split and protocol fee bookkeeping.
pub mod fees;
/// Re-entrancy guard.
pub mod guard;
/// Ledger collaborator.
pub mod ledger;
/// Checked integer math.
pub mod math;
/// Canonical asset pairs.
pub mod pair;
/// Identifiers and amounts.
pub mod token;
/// Value objects.
pub mod value_objects;
