//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use basecore_vesting::prelude::*;
//! ```

pub use crate::engine::{ReleaseReport, VestingEngine, VestingStats};
pub use crate::schedule::{ScheduleRequest, VestingSchedule, VestingStatus, vested_amount};
