//! Device selection
//!
//! Decides which enumerated devices get reset. A device is selected when its
//! vendor ID is listed in `--vendorid` or its `vendor:product` pair is listed
//! in `--device`. Identifiers are compared as text in the form produced by
//! [`common::format_id`], so `046d` matches but `046D` and `0x046d` do not.
//! With no criteria at all nothing is selected.

use common::DeviceDescriptor;
use std::fmt;
use tracing::{debug, info};

/// Which criterion selected a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    VendorId,
    DeviceId,
}

impl MatchReason {
    /// Evaluation order; the first kind that matches wins
    pub const ORDER: [MatchReason; 2] = [MatchReason::VendorId, MatchReason::DeviceId];
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VendorId => write!(f, "VendorID matching"),
            Self::DeviceId => write!(f, "Device ID matching"),
        }
    }
}

/// User-configured match sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    vendor_ids: Vec<String>,
    device_ids: Vec<String>,
}

impl SelectionCriteria {
    pub fn new(vendor_ids: Vec<String>, device_ids: Vec<String>) -> Self {
        Self {
            vendor_ids,
            device_ids,
        }
    }

    pub fn vendor_ids(&self) -> &[String] {
        &self.vendor_ids
    }

    pub fn device_ids(&self) -> &[String] {
        &self.device_ids
    }

    /// True when no criterion is configured and nothing can match
    pub fn is_empty(&self) -> bool {
        self.vendor_ids.is_empty() && self.device_ids.is_empty()
    }

    /// Find the first criterion kind that selects `desc`
    pub fn matches(&self, desc: &DeviceDescriptor) -> Option<MatchReason> {
        MatchReason::ORDER
            .into_iter()
            .find(|reason| self.selected_by(*reason, desc))
    }

    fn selected_by(&self, reason: MatchReason, desc: &DeviceDescriptor) -> bool {
        match reason {
            MatchReason::VendorId => {
                let vendor = desc.vendor_string();
                self.vendor_ids.iter().any(|v| *v == vendor)
            }
            MatchReason::DeviceId => {
                let device = desc.device_string();
                self.device_ids.iter().any(|d| *d == device)
            }
        }
    }

    /// Report `desc` to the user and decide whether it should be reset
    pub fn should_reset(&self, desc: &DeviceDescriptor) -> bool {
        println!(
            "{} {} {}",
            desc.location(),
            desc.device_string(),
            desc.describe()
        );
        println!("Protocol: {}", desc.classify());

        match self.matches(desc) {
            Some(reason) => {
                info!("{}, {} will be reset", reason, desc.device_string());
                true
            }
            None => {
                debug!("{} not selected", desc.device_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::create_mock_descriptor;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_criteria_selects_nothing() {
        let criteria = SelectionCriteria::default();
        assert!(criteria.is_empty());
        for (vid, pid) in [(0x0000, 0x0000), (0x046d, 0xc52b), (0xffff, 0xffff)] {
            let desc = create_mock_descriptor(1, vid, pid);
            assert_eq!(criteria.matches(&desc), None);
            assert!(!criteria.should_reset(&desc));
        }
    }

    #[test]
    fn test_truth_table() {
        let desc = create_mock_descriptor(4, 0x046d, 0xc52b);
        let vendor_hit = strings(&["046d"]);
        let vendor_miss = strings(&["1d6b"]);
        let device_hit = strings(&["046d:c52b"]);
        let device_miss = strings(&["046d:c534"]);

        let cases = [
            (vec![], vec![], None),
            (vendor_hit.clone(), vec![], Some(MatchReason::VendorId)),
            (vendor_miss.clone(), vec![], None),
            (vec![], device_hit.clone(), Some(MatchReason::DeviceId)),
            (vec![], device_miss.clone(), None),
            (vendor_hit.clone(), device_hit.clone(), Some(MatchReason::VendorId)),
            (vendor_hit.clone(), device_miss.clone(), Some(MatchReason::VendorId)),
            (vendor_miss.clone(), device_hit.clone(), Some(MatchReason::DeviceId)),
            (vendor_miss, device_miss, None),
        ];

        for (vendors, devices, expected) in cases {
            let criteria = SelectionCriteria::new(vendors.clone(), devices.clone());
            assert_eq!(
                criteria.matches(&desc),
                expected,
                "vendors={vendors:?} devices={devices:?}"
            );
            assert_eq!(criteria.should_reset(&desc), expected.is_some());
        }
    }

    #[test]
    fn test_vendor_checked_before_device() {
        let criteria = SelectionCriteria::new(strings(&["046d"]), strings(&["046d:c52b"]));
        let desc = create_mock_descriptor(1, 0x046d, 0xc52b);
        assert_eq!(criteria.matches(&desc), Some(MatchReason::VendorId));
    }

    #[test]
    fn test_matching_is_case_and_format_sensitive() {
        let desc = create_mock_descriptor(1, 0x046d, 0xc52b);
        for vendor in ["046D", "0x046d", "46d", " 046d"] {
            let criteria = SelectionCriteria::new(strings(&[vendor]), vec![]);
            assert_eq!(criteria.matches(&desc), None, "{vendor} should not match");
        }
        for device in ["046D:C52B", "0x046d:0xc52b", "046d-c52b", "046d:c52b "] {
            let criteria = SelectionCriteria::new(vec![], strings(&[device]));
            assert_eq!(criteria.matches(&desc), None, "{device} should not match");
        }
    }

    #[test]
    fn test_composite_identifier_round_trip() {
        for (vid, pid, written) in [
            (0x046d_u16, 0xc52b_u16, "046d:c52b"),
            (0x1d6b, 0x0002, "1d6b:0002"),
            (0x0403, 0x6001, "0403:6001"),
            (0x0001, 0x0010, "0001:0010"),
        ] {
            let desc = create_mock_descriptor(1, vid, pid);
            assert_eq!(desc.device_string(), written);
            let criteria = SelectionCriteria::new(vec![], strings(&[written]));
            assert_eq!(criteria.matches(&desc), Some(MatchReason::DeviceId));
        }
    }

    #[test]
    fn test_duplicates_are_harmless() {
        let criteria = SelectionCriteria::new(
            strings(&["046d", "046d"]),
            strings(&["1d6b:0002", "1d6b:0002"]),
        );
        assert!(criteria.should_reset(&create_mock_descriptor(1, 0x046d, 0x0001)));
        assert!(criteria.should_reset(&create_mock_descriptor(2, 0x1d6b, 0x0002)));
        assert!(!criteria.should_reset(&create_mock_descriptor(3, 0x1d6b, 0x0003)));
    }

    #[test]
    fn test_match_reason_display() {
        assert_eq!(MatchReason::VendorId.to_string(), "VendorID matching");
        assert_eq!(MatchReason::DeviceId.to_string(), "Device ID matching");
    }
}
