//! USB device abstraction
//!
//! This module provides a wrapper around an opened rusb device handle with a
//! cached descriptor, implementing [`ResetHandle`] for the reset loop.

use common::{DeviceDescriptor, DeviceSpeed, Error, ResetHandle};
use rusb::{Context, Device, DeviceHandle};
use tracing::debug;

/// Opened USB device
///
/// The libusb handle is closed when this value is dropped.
pub struct UsbDevice {
    /// Device handle
    handle: DeviceHandle<Context>,
    /// Cached descriptor, including strings read after opening
    descriptor: DeviceDescriptor,
}

impl UsbDevice {
    /// Open `device` and read its string descriptors
    ///
    /// String reads are best effort; a device that refuses them still opens.
    pub fn open(
        device: &Device<Context>,
        mut descriptor: DeviceDescriptor,
    ) -> Result<Self, Error> {
        let handle = device.open().map_err(|e| Error::Open {
            device: descriptor.device_string(),
            reason: e.to_string(),
        })?;

        if let Ok(raw) = device.device_descriptor() {
            descriptor.manufacturer = raw
                .manufacturer_string_index()
                .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());
            descriptor.product = raw
                .product_string_index()
                .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());
        }

        debug!(
            "Opened device {} at {}",
            descriptor.device_string(),
            descriptor.location()
        );
        Ok(Self { handle, descriptor })
    }
}

impl ResetHandle for UsbDevice {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.handle.reset().map_err(|e| Error::Reset {
            device: self.descriptor.device_string(),
            reason: e.to_string(),
        })?;
        debug!("Reset device {}", self.descriptor.device_string());
        Ok(())
    }
}

impl Drop for UsbDevice {
    fn drop(&mut self) {
        debug!("Closed device {}", self.descriptor.device_string());
    }
}

/// Read the descriptor of an unopened device
pub fn describe_device(device: &Device<Context>) -> Result<DeviceDescriptor, rusb::Error> {
    let desc = device.device_descriptor()?;

    Ok(DeviceDescriptor {
        bus_number: device.bus_number(),
        device_address: device.address(),
        vendor_id: desc.vendor_id(),
        product_id: desc.product_id(),
        class: desc.class_code(),
        subclass: desc.sub_class_code(),
        protocol: desc.protocol_code(),
        speed: map_device_speed(device.speed()),
        manufacturer: None,
        product: None,
    })
}

/// Map rusb device speed to DeviceSpeed
fn map_device_speed(speed: rusb::Speed) -> DeviceSpeed {
    match speed {
        rusb::Speed::Low => DeviceSpeed::Low,
        rusb::Speed::Full => DeviceSpeed::Full,
        rusb::Speed::High => DeviceSpeed::High,
        rusb::Speed::Super => DeviceSpeed::Super,
        rusb::Speed::SuperPlus => DeviceSpeed::SuperPlus,
        _ => DeviceSpeed::Unknown,
    }
}
