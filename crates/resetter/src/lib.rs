//! USB device reset tool
//!
//! Enumerates attached USB devices, selects the ones matching the configured
//! vendor or `vendor:product` identifiers, and issues a port reset to each of
//! them in turn with a settle time in between.

pub mod config;
pub mod criteria;
pub mod orchestrator;
pub mod usb;

pub use config::{Overrides, ResetConfig};
pub use criteria::{MatchReason, SelectionCriteria};
pub use orchestrator::{ResetOrchestrator, ResetOutcome, RunSummary, reset_matching};
