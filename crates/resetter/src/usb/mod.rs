//! USB subsystem
//!
//! libusb access through rusb: enumerating devices, opening the ones that
//! were selected and resetting them.

pub mod device;
pub mod manager;

// Re-export public types
pub use device::UsbDevice;
pub use manager::DeviceManager;
