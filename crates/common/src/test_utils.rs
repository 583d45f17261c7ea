//! Test utilities for usb-reset
//!
//! Provides a mock USB backend and descriptor helpers for testing across
//! crates. The mock records every open, reset and close into a shared
//! [`EventLog`] so tests can check that handles are released.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{HandleEvent, MockBackend, create_mock_descriptor};
//! use common::UsbBackend;
//!
//! let backend = MockBackend::new().with_device(create_mock_descriptor(1, 0x1234, 0x5678));
//! let handles = backend.open_devices(|_| true).unwrap();
//! drop(handles);
//! assert_eq!(
//!     backend.events(),
//!     vec![
//!         HandleEvent::Opened("1234:5678".to_string()),
//!         HandleEvent::Closed("1234:5678".to_string()),
//!     ]
//! );
//! ```

use crate::usb_types::{DeviceDescriptor, DeviceSpeed, ResetHandle, UsbBackend};
use crate::{Error, Result};
use std::sync::{Arc, Mutex};

/// Create a mock DeviceDescriptor for testing
///
/// # Arguments
/// * `address` - Device address on bus 1
/// * `vendor_id` - USB Vendor ID
/// * `product_id` - USB Product ID
pub fn create_mock_descriptor(address: u8, vendor_id: u16, product_id: u16) -> DeviceDescriptor {
    DeviceDescriptor {
        bus_number: 1,
        device_address: address,
        vendor_id,
        product_id,
        class: 0x00,
        subclass: 0x00,
        protocol: 0x00,
        speed: DeviceSpeed::High,
        manufacturer: None,
        product: None,
    }
}

/// Create `count` descriptors sharing vendor 0x1234 with products 1..=count
pub fn create_mock_descriptor_list(count: u8) -> Vec<DeviceDescriptor> {
    (1..=count)
        .map(|i| create_mock_descriptor(i, 0x1234, u16::from(i)))
        .collect()
}

/// Something that happened to a mock device, keyed by `vendor:product`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleEvent {
    Opened(String),
    Reset(String),
    ResetFailed(String),
    Closed(String),
}

/// Shared, ordered record of handle events
pub type EventLog = Arc<Mutex<Vec<HandleEvent>>>;

#[derive(Debug, Clone)]
struct MockDevice {
    descriptor: DeviceDescriptor,
    open_error: Option<String>,
    reset_error: Option<String>,
}

/// In-memory USB backend
#[derive(Debug, Default)]
pub struct MockBackend {
    devices: Vec<MockDevice>,
    enumeration_error: Option<String>,
    events: EventLog,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device that opens and resets cleanly
    pub fn with_device(mut self, descriptor: DeviceDescriptor) -> Self {
        self.devices.push(MockDevice {
            descriptor,
            open_error: None,
            reset_error: None,
        });
        self
    }

    /// Add a device whose reset fails with `reason`
    pub fn with_failing_reset(mut self, descriptor: DeviceDescriptor, reason: &str) -> Self {
        self.devices.push(MockDevice {
            descriptor,
            open_error: None,
            reset_error: Some(reason.to_string()),
        });
        self
    }

    /// Add a device that cannot be opened
    pub fn with_failing_open(mut self, descriptor: DeviceDescriptor, reason: &str) -> Self {
        self.devices.push(MockDevice {
            descriptor,
            open_error: Some(reason.to_string()),
            reset_error: None,
        });
        self
    }

    /// Make listing devices fail with `reason`
    pub fn failing_enumeration(mut self, reason: &str) -> Self {
        self.enumeration_error = Some(reason.to_string());
        self
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<HandleEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of recorded events matching `pred`
    pub fn count(&self, pred: impl Fn(&HandleEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn opened(&self) -> usize {
        self.count(|e| matches!(e, HandleEvent::Opened(_)))
    }

    pub fn closed(&self) -> usize {
        self.count(|e| matches!(e, HandleEvent::Closed(_)))
    }

    fn record(&self, event: HandleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl UsbBackend for MockBackend {
    type Handle = MockHandle;

    fn open_devices<F>(&self, mut select: F) -> Result<Vec<MockHandle>>
    where
        F: FnMut(&DeviceDescriptor) -> bool,
    {
        if let Some(reason) = &self.enumeration_error {
            return Err(Error::Enumeration(reason.clone()));
        }

        let mut handles = Vec::new();
        for device in &self.devices {
            if !select(&device.descriptor) {
                continue;
            }
            let key = device.descriptor.device_string();
            if let Some(reason) = &device.open_error {
                return Err(Error::Open {
                    device: key,
                    reason: reason.clone(),
                });
            }
            self.record(HandleEvent::Opened(key));
            handles.push(MockHandle {
                descriptor: device.descriptor.clone(),
                reset_error: device.reset_error.clone(),
                events: Arc::clone(&self.events),
            });
        }
        Ok(handles)
    }
}

/// Handle returned by [`MockBackend`]; records `Closed` when dropped
#[derive(Debug)]
pub struct MockHandle {
    descriptor: DeviceDescriptor,
    reset_error: Option<String>,
    events: EventLog,
}

impl ResetHandle for MockHandle {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn reset(&mut self) -> Result<()> {
        let key = self.descriptor.device_string();
        match &self.reset_error {
            Some(reason) => {
                self.events
                    .lock()
                    .unwrap()
                    .push(HandleEvent::ResetFailed(key.clone()));
                Err(Error::Reset {
                    device: key,
                    reason: reason.clone(),
                })
            }
            None => {
                self.events.lock().unwrap().push(HandleEvent::Reset(key));
                Ok(())
            }
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let key = self.descriptor.device_string();
        if let Ok(mut events) = self.events.lock() {
            events.push(HandleEvent::Closed(key));
        }
    }
}
