//! USB device manager
//!
//! Owns the libusb context for the whole run and implements device
//! enumeration on top of it.

use crate::usb::device::{UsbDevice, describe_device};
use common::{DeviceDescriptor, Error, UsbBackend};
use rusb::{Context, LogLevel, UsbContext};
use tracing::{debug, warn};

/// rusb-backed USB access
///
/// The context is released when the manager is dropped. Opened devices keep
/// their own reference to it, so they may outlive the manager.
pub struct DeviceManager {
    /// USB context for device operations
    context: Context,
}

impl DeviceManager {
    /// Create a new device manager
    ///
    /// `debug_level` 0..=3 sets libusb's own logging from silent to info.
    pub fn new(debug_level: u8) -> Result<Self, Error> {
        let mut context = Context::new()
            .map_err(|e| Error::Usb(format!("Failed to initialize libusb: {}", e)))?;
        context.set_log_level(libusb_log_level(debug_level));

        debug!("libusb context created (debug level {})", debug_level);
        Ok(Self { context })
    }
}

impl UsbBackend for DeviceManager {
    type Handle = UsbDevice;

    fn open_devices<F>(&self, mut select: F) -> Result<Vec<UsbDevice>, Error>
    where
        F: FnMut(&DeviceDescriptor) -> bool,
    {
        let devices = self
            .context
            .devices()
            .map_err(|e| Error::Enumeration(e.to_string()))?;

        let mut opened = Vec::new();
        for device in devices.iter() {
            let descriptor = match describe_device(&device) {
                Ok(d) => d,
                Err(e) => {
                    warn!(
                        "Skipping device at {:03}.{:03}: failed to read descriptor: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    continue;
                }
            };

            if select(&descriptor) {
                opened.push(UsbDevice::open(&device, descriptor)?);
            }
        }

        debug!("Opened {} of {} devices", opened.len(), devices.len());
        Ok(opened)
    }
}

/// Map the `--debug` level onto libusb's log levels
fn libusb_log_level(debug_level: u8) -> LogLevel {
    match debug_level {
        0 => LogLevel::None,
        1 => LogLevel::Error,
        2 => LogLevel::Warning,
        _ => LogLevel::Info,
    }
}
