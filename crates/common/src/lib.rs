//! Common utilities for usb-reset
//!
//! This crate provides the pieces shared by the reset tool and its tests:
//! error handling, logging setup, USB descriptor types and the traits a USB
//! backend implements.

pub mod error;
pub mod logging;
pub mod test_utils;
pub mod usb_types;

pub use error::{Error, Result};
pub use logging::setup_logging;
pub use usb_types::{DeviceDescriptor, DeviceSpeed, ResetHandle, UsbBackend, format_id, known_name};
