//! USB type abstractions and utilities
//!
//! Descriptor metadata shared between the selection logic and the USB
//! backends, plus the traits a backend implements so the reset loop never
//! touches libusb directly.

use std::fmt;
use usb_ids::FromId;

/// Format a vendor or product identifier the way criteria are written
///
/// Always four lowercase hex digits without a prefix, e.g. `046d`.
pub fn format_id(id: u16) -> String {
    format!("{:04x}", id)
}

/// Metadata for one discovered USB device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Bus number on the host
    pub bus_number: u8,
    /// Device address on the bus
    pub device_address: u8,
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// USB device class
    pub class: u8,
    /// USB device subclass
    pub subclass: u8,
    /// USB device protocol
    pub protocol: u8,
    /// Negotiated link speed
    pub speed: DeviceSpeed,
    /// Manufacturer string (only read once the device is open)
    pub manufacturer: Option<String>,
    /// Product string (only read once the device is open)
    pub product: Option<String>,
}

impl DeviceDescriptor {
    /// Vendor identifier as matched against `--vendorid`
    pub fn vendor_string(&self) -> String {
        format_id(self.vendor_id)
    }

    /// Product identifier in the same textual form as the vendor
    pub fn product_string(&self) -> String {
        format_id(self.product_id)
    }

    /// Composite `vendor:product` identifier as matched against `--device`
    pub fn device_string(&self) -> String {
        format!("{}:{}", self.vendor_string(), self.product_string())
    }

    /// Bus and address as `BBB.AAA`
    pub fn location(&self) -> String {
        format!("{:03}.{:03}", self.bus_number, self.device_address)
    }

    /// Human-readable description
    ///
    /// Names come from the usb.ids database, so they are available before the
    /// device is opened. Devices missing from it fall back to the strings read
    /// from the opened device.
    pub fn describe(&self) -> String {
        known_name(self.vendor_id, self.product_id)
            .or_else(|| self.string_description())
            .unwrap_or_else(|| "Unknown device".to_string())
    }

    fn string_description(&self) -> Option<String> {
        match (self.manufacturer.as_deref(), self.product.as_deref()) {
            (Some(m), Some(p)) => Some(format!("{} {}", m, p)),
            (Some(m), None) => Some(m.to_string()),
            (None, Some(p)) => Some(p.to_string()),
            (None, None) => None,
        }
    }

    /// Class, subclass and protocol rendered as text
    pub fn classify(&self) -> String {
        let name = class_name(self.class);
        if self.subclass == 0 && self.protocol == 0 {
            name.to_string()
        } else {
            format!(
                "{} (subclass 0x{:02x}, protocol 0x{:02x})",
                name, self.subclass, self.protocol
            )
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.device_string(), self.describe())
    }
}

/// Product and vendor name from the usb.ids database
///
/// A listed vendor with an unlisted product still gets the vendor name.
pub fn known_name(vendor_id: u16, product_id: u16) -> Option<String> {
    if let Some(device) = usb_ids::Device::from_vid_pid(vendor_id, product_id) {
        return Some(format!("{} ({})", device.name(), device.vendor().name()));
    }
    usb_ids::Vendor::from_id(vendor_id)
        .map(|vendor| format!("Unknown product ({})", vendor.name()))
}

/// USB device speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSpeed {
    /// Speed not reported by the host controller
    #[default]
    Unknown,
    /// Low speed - 1.5 Mbps (USB 1.0)
    Low,
    /// Full speed - 12 Mbps (USB 1.1)
    Full,
    /// High speed - 480 Mbps (USB 2.0)
    High,
    /// SuperSpeed - 5 Gbps (USB 3.0)
    Super,
    /// SuperSpeed+ - 10 Gbps (USB 3.1)
    SuperPlus,
}

impl fmt::Display for DeviceSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Low => "low (1.5 Mbit/s)",
            Self::Full => "full (12 Mbit/s)",
            Self::High => "high (480 Mbit/s)",
            Self::Super => "super (5 Gbit/s)",
            Self::SuperPlus => "super+ (10 Gbit/s)",
        };
        f.write_str(s)
    }
}

/// Name of a USB base class code
pub fn class_name(code: u8) -> &'static str {
    match code {
        0x00 => "Per-interface class",
        0x01 => "Audio",
        0x02 => "Communications (CDC)",
        0x03 => "Human Interface Device",
        0x05 => "Physical",
        0x06 => "Image",
        0x07 => "Printer",
        0x08 => "Mass Storage",
        0x09 => "Hub",
        0x0a => "CDC Data",
        0x0b => "Smart Card",
        0x0d => "Content Security",
        0x0e => "Video",
        0x0f => "Personal Healthcare",
        0x10 => "Audio/Video",
        0x11 => "Billboard",
        0x12 => "USB Type-C Bridge",
        0xdc => "Diagnostic Device",
        0xe0 => "Wireless Controller",
        0xef => "Miscellaneous",
        0xfe => "Application Specific",
        0xff => "Vendor Specific",
        _ => "Unknown class",
    }
}

/// An opened device that can be reset
///
/// Dropping the handle closes the device. Owning the handle is the only way
/// to reach it, so every handle is closed exactly once.
pub trait ResetHandle {
    /// Descriptor of the opened device
    fn descriptor(&self) -> &DeviceDescriptor;

    /// Issue a port reset; the device re-enumerates afterwards
    fn reset(&mut self) -> crate::Result<()>;
}

/// Access to the host's USB devices
pub trait UsbBackend {
    type Handle: ResetHandle;

    /// Enumerate devices and open every one `select` accepts
    ///
    /// `select` is called once per discovered device, before it is opened,
    /// in enumeration order. Fails with [`crate::Error::Enumeration`] if the
    /// device list cannot be read and [`crate::Error::Open`] if a selected
    /// device cannot be opened. Handles opened before a failure are dropped.
    fn open_devices<F>(&self, select: F) -> crate::Result<Vec<Self::Handle>>
    where
        F: FnMut(&DeviceDescriptor) -> bool;

    /// Enumerate devices without opening any of them
    fn list_devices(&self) -> crate::Result<Vec<DeviceDescriptor>> {
        let mut found = Vec::new();
        self.open_devices(|desc| {
            found.push(desc.clone());
            false
        })?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(vendor_id: u16, product_id: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            bus_number: 3,
            device_address: 14,
            vendor_id,
            product_id,
            class: 0x09,
            subclass: 0,
            protocol: 0,
            speed: DeviceSpeed::High,
            manufacturer: None,
            product: None,
        }
    }

    #[test]
    fn test_identifiers_are_lowercase_zero_padded() {
        let desc = descriptor(0x046D, 0xC52B);
        assert_eq!(desc.vendor_string(), "046d");
        assert_eq!(desc.product_string(), "c52b");
        assert_eq!(desc.device_string(), "046d:c52b");

        let desc = descriptor(0x1, 0x2);
        assert_eq!(desc.device_string(), "0001:0002");
    }

    #[test]
    fn test_location_format() {
        assert_eq!(descriptor(0, 0).location(), "003.014");
    }

    #[test]
    fn test_describe_uses_usb_ids_before_open() {
        let desc = descriptor(0x1d6b, 0x0002);
        let description = desc.describe();
        assert_ne!(description, "Unknown device");
        assert!(description.contains("Linux Foundation"), "{description}");
        assert!(description.contains("root hub"), "{description}");
        assert_eq!(desc.to_string(), format!("1d6b:0002 ({description})"));
    }

    #[test]
    fn test_known_name_for_unlisted_product() {
        let name = known_name(0x1d6b, 0xfff0).unwrap();
        assert_eq!(name, "Unknown product (Linux Foundation)");
    }

    #[test]
    fn test_string_description_from_opened_device() {
        let mut desc = descriptor(0x046d, 0xc52b);
        assert_eq!(desc.string_description(), None);

        desc.product = Some("USB Receiver".to_string());
        assert_eq!(desc.string_description().as_deref(), Some("USB Receiver"));

        desc.manufacturer = Some("Logitech".to_string());
        assert_eq!(
            desc.string_description().as_deref(),
            Some("Logitech USB Receiver")
        );
    }

    #[test]
    fn test_classify() {
        let mut desc = descriptor(0x1d6b, 0x0002);
        assert_eq!(desc.classify(), "Hub");

        desc.protocol = 0x01;
        assert_eq!(desc.classify(), "Hub (subclass 0x00, protocol 0x01)");

        assert_eq!(class_name(0x08), "Mass Storage");
        assert_eq!(class_name(0xff), "Vendor Specific");
        assert_eq!(class_name(0x42), "Unknown class");
    }

    #[test]
    fn test_speed_display() {
        assert_eq!(DeviceSpeed::High.to_string(), "high (480 Mbit/s)");
        assert_eq!(DeviceSpeed::default(), DeviceSpeed::Unknown);
    }
}
