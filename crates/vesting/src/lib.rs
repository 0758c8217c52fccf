//! Token vesting with a cliff and linear release.
//!
//! This crate provides:
//! - One escrowed schedule per beneficiary
//! - Single and batch creation, release and revocation
//! - An emergency mode with authorized withdrawers
//! - Engine-wide statistics

/// Prelude module for convenient imports.
pub mod prelude;

/// Vesting engine.
pub mod engine;
/// Schedules and the vesting curve.
pub mod schedule;
