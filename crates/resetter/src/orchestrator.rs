//! Reset orchestration
//!
//! Resets the selected devices one at a time, in enumeration order, and
//! waits after each reset so the device can re-enumerate before the next one
//! is touched.
//!
//! Handles are consumed as they are processed: each one is dropped (closed)
//! right after its reset attempt. On an abort the candidates that were never
//! reached are dropped with the iterator, so every opened handle is closed
//! before the error reaches the caller.

use crate::config::ResetConfig;
use common::{Error, ResetHandle, Result, UsbBackend};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Result of processing one device
#[derive(Debug)]
pub enum ResetOutcome {
    /// The device accepted the reset
    Reset,
    /// The reset failed and the run carried on
    Failed(Error),
    /// Dry run; the device was opened but not reset
    Skipped,
}

impl ResetOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Per-device outcomes of a completed run, in processing order
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(String, ResetOutcome)>,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn reset_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ResetOutcome::Reset))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes.iter().filter_map(|(device, outcome)| match outcome {
            ResetOutcome::Failed(e) => Some((device.as_str(), e)),
            _ => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failure()).count()
    }
}

/// Drives the reset-and-wait loop
#[derive(Debug, Clone)]
pub struct ResetOrchestrator {
    wait: Duration,
    continue_on_error: bool,
    dry_run: bool,
}

impl ResetOrchestrator {
    pub fn new(wait: Duration, continue_on_error: bool) -> Self {
        Self {
            wait,
            continue_on_error,
            dry_run: false,
        }
    }

    pub fn from_config(config: &ResetConfig) -> Self {
        Self::new(config.reset.wait, config.reset.continue_on_error)
    }

    /// Open and report devices without resetting them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reset every candidate in order
    ///
    /// Without continue-on-error the first failed reset ends the run with
    /// [`Error::Reset`]; later candidates are closed without being reset.
    pub fn run<H: ResetHandle>(&self, candidates: Vec<H>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let total = candidates.len();

        for (index, mut handle) in candidates.into_iter().enumerate() {
            let desc = handle.descriptor();
            let device = desc.device_string();
            info!("[{}/{}] Resetting USB device {}", index + 1, total, desc);
            info!("at address {} (speed {})", desc.location(), desc.speed);

            if self.dry_run {
                info!("Dry run, not resetting {}", device);
                summary.outcomes.push((device, ResetOutcome::Skipped));
                continue;
            }

            match handle.reset() {
                Ok(()) => {
                    info!("Reset {} complete", device);
                    summary.outcomes.push((device, ResetOutcome::Reset));
                }
                Err(e) if self.continue_on_error && e.is_recoverable() => {
                    warn!("{}, continuing", e);
                    summary.outcomes.push((device, ResetOutcome::Failed(e)));
                }
                Err(e) => {
                    error!("{}, aborting", e);
                    drop(handle);
                    return Err(e);
                }
            }
            drop(handle);

            self.settle();
        }

        Ok(summary)
    }

    fn settle(&self) {
        if !self.wait.is_zero() {
            info!("Waiting {:?} for the device to settle", self.wait);
            thread::sleep(self.wait);
        }
    }
}

/// Select, open and reset matching devices
///
/// Enumeration or open failures abort before any device is reset.
pub fn reset_matching<B: UsbBackend>(
    backend: &B,
    config: &ResetConfig,
    dry_run: bool,
) -> Result<RunSummary> {
    let criteria = config.reset.criteria();
    let candidates = backend.open_devices(|desc| criteria.should_reset(desc))?;
    info!("{} device(s) selected for reset", candidates.len());

    ResetOrchestrator::from_config(config)
        .with_dry_run(dry_run)
        .run(candidates)
}
