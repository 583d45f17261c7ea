//! Reset tool configuration management
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags. The merged [`ResetConfig`] is never mutated after
//! startup.

use crate::criteria::SelectionCriteria;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use duration_serde::{format_duration, parse_duration};

/// Highest libusb debug level accepted by `--debug`
pub const MAX_DEBUG_LEVEL: u8 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetConfig {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub usb: UsbSettings,
    #[serde(default)]
    pub reset: ResetSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_log_level")]
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

impl LoggingSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsbSettings {
    /// libusb verbosity (0 = silent .. 3 = info)
    #[serde(default)]
    pub debug_level: u8,
}

/// What to reset and how
///
/// # Example Configuration
/// ```toml
/// [reset]
/// vendor_ids = ["046d"]
/// devices = ["1d6b:0002"]
/// wait = "4s"
/// continue_on_error = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetSettings {
    /// Reset every device from these vendors (`vvvv`, lowercase hex)
    #[serde(default)]
    pub vendor_ids: Vec<String>,
    /// Reset these exact devices (`vvvv:pppp`, lowercase hex)
    #[serde(default)]
    pub devices: Vec<String>,
    /// Settle time after each reset
    #[serde(default = "ResetSettings::default_wait", with = "duration_serde")]
    pub wait: Duration,
    /// Keep going when a device fails to reset
    #[serde(default)]
    pub continue_on_error: bool,
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self {
            vendor_ids: Vec::new(),
            devices: Vec::new(),
            wait: Self::default_wait(),
            continue_on_error: false,
        }
    }
}

impl ResetSettings {
    fn default_wait() -> Duration {
        Duration::from_secs(4)
    }

    /// Build the match sets used to select devices
    pub fn criteria(&self) -> SelectionCriteria {
        SelectionCriteria::new(self.vendor_ids.clone(), self.devices.clone())
    }
}

/// Values given on the command line
///
/// `None` and empty lists leave the file value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub debug_level: Option<u8>,
    pub vendor_ids: Vec<String>,
    pub devices: Vec<String>,
    pub wait: Option<Duration>,
    pub continue_on_error: bool,
}

/// Custom serde module for Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        format_duration(*duration).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    const NANOS_PER_SEC: u128 = 1_000_000_000;

    /// Parse a duration string like "4s", "500ms", "1m30s", "1.5s"
    ///
    /// Units are h, m, s, ms, us (or µs) and ns. A trailing number without a
    /// unit is taken as seconds. Zero is allowed.
    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let input = s.trim().to_lowercase();
        if input.is_empty() {
            return Err("Empty duration".to_string());
        }

        let mut total: u128 = 0;
        let mut rest = input.as_str();

        while !rest.is_empty() {
            let split = rest
                .find(|c: char| !is_number_char(c))
                .unwrap_or(rest.len());
            let (number, tail) = rest.split_at(split);
            let split = tail.find(is_number_char).unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(split);

            let scale = match unit {
                "h" => 3_600 * NANOS_PER_SEC,
                "m" => 60 * NANOS_PER_SEC,
                "s" | "" => NANOS_PER_SEC,
                "ms" => 1_000_000,
                "us" | "µs" | "μs" => 1_000,
                "ns" => 1,
                _ => return Err(format!("Invalid duration unit: {}", unit)),
            };

            total = total
                .checked_add(scale_number(number, scale, &input)?)
                .ok_or_else(|| format!("Duration too large: {}", input))?;
            rest = tail;
        }

        let secs = u64::try_from(total / NANOS_PER_SEC)
            .map_err(|_| format!("Duration too large: {}", input))?;
        Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
    }

    fn is_number_char(c: char) -> bool {
        c.is_ascii_digit() || c == '.'
    }

    /// `number` in units of `scale` nanoseconds; digits below 1ns are dropped
    fn scale_number(number: &str, scale: u128, input: &str) -> Result<u128, String> {
        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
            return Err(format!("Invalid duration format: {}", input));
        }

        let too_large = || format!("Duration too large: {}", input);
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| too_large())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(too_large)?;

        let mut place = scale;
        for digit in frac.bytes() {
            place /= 10;
            nanos = nanos
                .checked_add(u128::from(digit - b'0') * place)
                .ok_or_else(too_large)?;
        }

        Ok(nanos)
    }

    pub fn format_duration(d: Duration) -> String {
        let secs = d.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;
        let millis = d.subsec_millis();
        let micros = d.subsec_micros() % 1_000;
        let nanos = d.subsec_nanos() % 1_000;

        let mut result = String::new();
        if hours > 0 {
            result.push_str(&format!("{}h", hours));
        }
        if mins > 0 {
            result.push_str(&format!("{}m", mins));
        }
        if secs > 0 {
            result.push_str(&format!("{}s", secs));
        }
        if millis > 0 {
            result.push_str(&format!("{}ms", millis));
        }
        if micros > 0 {
            result.push_str(&format!("{}us", micros));
        }
        if nanos > 0 {
            result.push_str(&format!("{}ns", nanos));
        }
        if result.is_empty() {
            result.push_str("0s");
        }
        result
    }
}

impl ResetConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).into_owned())
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usb-reset/config.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ResetConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usb-reset").join("config.toml")
        } else {
            PathBuf::from(".config/usb-reset/config.toml")
        }
    }

    /// Merge command-line values into the loaded configuration
    ///
    /// Criteria lists are appended, scalars replace, and `--continue` can
    /// only switch continue-on-error on.
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(level) = overrides.log_level {
            self.logging.log_level = level;
        }
        if let Some(debug_level) = overrides.debug_level {
            self.usb.debug_level = debug_level;
        }
        self.reset.vendor_ids.extend(overrides.vendor_ids);
        self.reset.devices.extend(overrides.devices);
        if let Some(wait) = overrides.wait {
            self.reset.wait = wait;
        }
        self.reset.continue_on_error |= overrides.continue_on_error;
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.usb.debug_level > MAX_DEBUG_LEVEL {
            return Err(anyhow!(
                "Invalid debug level {}, must be between 0 and {}",
                self.usb.debug_level,
                MAX_DEBUG_LEVEL
            ));
        }

        Ok(())
    }

    /// Describe criteria that can never match a device
    ///
    /// Matching compares text exactly, so `0x046D` silently matches nothing.
    /// These are reported, not rejected.
    pub fn lint_identifiers(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for vendor in &self.reset.vendor_ids {
            if !is_canonical_id(vendor) {
                warnings.push(format!(
                    "Vendor ID '{}' is not 4 lowercase hex digits (e.g. '046d') and will not match",
                    vendor
                ));
            }
        }

        for device in &self.reset.devices {
            let canonical = device
                .split_once(':')
                .is_some_and(|(vid, pid)| is_canonical_id(vid) && is_canonical_id(pid));
            if !canonical {
                warnings.push(format!(
                    "Device ID '{}' is not in 'vvvv:pppp' lowercase hex form (e.g. '046d:c52b') and will not match",
                    device
                ));
            }
        }

        warnings
    }
}

fn is_canonical_id(id: &str) -> bool {
    id.len() == 4
        && id
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
