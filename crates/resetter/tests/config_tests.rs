//! Integration tests for configuration parsing
//!
//! Tests loading the TOML configuration file, including:
//! - Minimal and full documents
//! - Defaults for missing sections
//! - Invalid configuration handling
//! - Save and reload through the filesystem

use resetter::config::{Overrides, ResetConfig};
use std::time::Duration;

const MINIMAL_CONFIG: &str = r#"
[reset]
vendor_ids = ["046d"]
"#;

const FULL_CONFIG: &str = r#"
[logging]
log_level = "debug"

[usb]
debug_level = 2

[reset]
vendor_ids = ["046d", "1d6b"]
devices = ["0403:6001"]
wait = "1m30s"
continue_on_error = true
"#;

mod parsing {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ResetConfig::from_toml(MINIMAL_CONFIG).unwrap();
        assert_eq!(config.logging.log_level, "info");
        assert_eq!(config.usb.debug_level, 0);
        assert_eq!(config.reset.vendor_ids, vec!["046d"]);
        assert!(config.reset.devices.is_empty());
        assert_eq!(config.reset.wait, Duration::from_secs(4));
        assert!(!config.reset.continue_on_error);
    }

    #[test]
    fn test_full_config() {
        let config = ResetConfig::from_toml(FULL_CONFIG).unwrap();
        assert_eq!(config.logging.log_level, "debug");
        assert_eq!(config.usb.debug_level, 2);
        assert_eq!(config.reset.vendor_ids, vec!["046d", "1d6b"]);
        assert_eq!(config.reset.devices, vec!["0403:6001"]);
        assert_eq!(config.reset.wait, Duration::from_secs(90));
        assert!(config.reset.continue_on_error);

        let criteria = config.reset.criteria();
        assert_eq!(criteria.vendor_ids(), ["046d", "1d6b"]);
        assert_eq!(criteria.device_ids(), ["0403:6001"]);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = ResetConfig::from_toml("").unwrap();
        assert_eq!(config, ResetConfig::default());
    }

    #[test]
    fn test_millisecond_wait() {
        let config = ResetConfig::from_toml("[reset]\nwait = \"750ms\"\n").unwrap();
        assert_eq!(config.reset.wait, Duration::from_millis(750));
    }
}

mod config_validation {
    use super::*;

    #[test]
    fn test_invalid_log_level_rejected() {
        let result = ResetConfig::from_toml("[logging]\nlog_level = \"verbose\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_level_out_of_range_rejected() {
        let result = ResetConfig::from_toml("[usb]\ndebug_level = 4\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_wait_rejected() {
        assert!(ResetConfig::from_toml("[reset]\nwait = \"soon\"\n").is_err());
        assert!(ResetConfig::from_toml("[reset]\nwait = \"4d\"\n").is_err());
    }

    #[test]
    fn test_wrong_types_rejected() {
        assert!(ResetConfig::from_toml("[reset]\nvendor_ids = \"046d\"\n").is_err());
        assert!(ResetConfig::from_toml("[reset]\ncontinue_on_error = \"yes\"\n").is_err());
    }

    #[test]
    fn test_noncanonical_identifiers_load_with_warnings() {
        let config =
            ResetConfig::from_toml("[reset]\nvendor_ids = [\"0x046D\"]\ndevices = [\"46d:c52b\"]\n")
                .unwrap();
        assert_eq!(config.lint_identifiers().len(), 2);
    }

    #[test]
    fn test_overrides_then_validate() {
        let mut config = ResetConfig::from_toml(MINIMAL_CONFIG).unwrap();
        config.apply_overrides(Overrides {
            debug_level: Some(9),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }
}

mod filesystem {
    use super::*;

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, FULL_CONFIG).unwrap();

        let config = ResetConfig::load(Some(path)).unwrap();
        assert_eq!(config.reset.devices, vec!["0403:6001"]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ResetConfig::load(Some(dir.path().join("missing.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[reset\nvendor_ids = ").unwrap();

        let err = ResetConfig::load(Some(path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("usb-reset").join("config.toml");

        let mut config = ResetConfig::default();
        config.reset.vendor_ids.push("046d".to_string());
        config.reset.devices.push("1d6b:0002".to_string());
        config.reset.wait = Duration::from_millis(2500);
        config.reset.continue_on_error = true;
        config.save(&path).unwrap();

        let reloaded = ResetConfig::load(Some(path)).unwrap();
        assert_eq!(config, reloaded);
    }
}
