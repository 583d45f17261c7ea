//! usb-reset
//!
//! Resets USB devices selected by vendor ID or vendor:product ID, waiting
//! after each reset for the device to come back.

use anyhow::{Context, Result};
use clap::Parser;
use common::{UsbBackend, setup_logging};
use resetter::config::{self, Overrides, ResetConfig};
use resetter::usb::DeviceManager;
use resetter::{RunSummary, reset_matching};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "usb-reset")]
#[command(author, version, about = "Reset USB devices by vendor or device ID")]
#[command(long_about = "
Resets every attached USB device whose vendor ID or vendor:product ID
matches one of the given criteria, one device at a time, pausing after
each reset so the device can re-enumerate.

Identifiers are written as four lowercase hex digits, exactly as shown by
--list-devices (e.g. 046d or 046d:c52b). With no criteria nothing is reset.

EXAMPLES:
    # Reset all Logitech devices
    usb-reset --vendorid 046d

    # Reset one specific device, then wait 10 seconds
    usb-reset --device 0403:6001 --wait 10s

    # Keep going if one of several devices fails to reset
    usb-reset --vendorid 046d --device 1d6b:0002 --continue

    # Show attached devices without touching them
    usb-reset --list-devices

CONFIGURATION:
    Settings are read from the first of:
    1. Path specified with --config
    2. ~/.config/usb-reset/config.toml
    3. /etc/usb-reset/config.toml
    4. Built-in defaults
    Command-line criteria are added to the ones in the file.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save the effective configuration to the default location and exit
    #[arg(long)]
    save_config: bool,

    /// libusb debug level (0..3)
    #[arg(long, value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(0..=3))]
    debug: Option<u8>,

    /// Reset all devices with this vendor ID. Can be specified multiple times.
    #[arg(long = "vendorid", value_name = "VID")]
    vendor_ids: Vec<String>,

    /// Reset all devices with this vID:pID. Can be specified multiple times.
    #[arg(long = "device", value_name = "VID:PID")]
    devices: Vec<String>,

    /// Sleep time after each USB device reset, e.g. 4s, 1.5s, 500ms, 1m30s
    /// (units h, m, s, ms, us, ns; a bare number means seconds) [default: 4s]
    #[arg(long, value_name = "DURATION", value_parser = config::parse_duration)]
    wait: Option<Duration>,

    /// Do not stop if a single reset fails
    #[arg(long = "continue", visible_alias = "continue-on-error")]
    continue_on_error: bool,

    /// Select and open devices but do not reset them
    #[arg(long)]
    dry_run: bool,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            log_level: self.log_level.clone(),
            debug_level: self.debug,
            vendor_ids: self.vendor_ids.clone(),
            devices: self.devices.clone(),
            wait: self.wait,
            continue_on_error: self.continue_on_error,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if let Some(ref path) = args.config {
        ResetConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        ResetConfig::load_or_default()
    };
    config.apply_overrides(args.overrides());
    config.validate().context("Invalid configuration")?;

    // Handle --save-config after merging so flags end up in the file
    if args.save_config {
        let path = ResetConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    setup_logging(&config.logging.log_level).context("Failed to setup logging")?;

    info!("usb-reset v{}", env!("CARGO_PKG_VERSION"));
    for warning in config.lint_identifiers() {
        warn!("{}", warning);
    }

    // Dropped at the end of main on every path, releasing the libusb context
    let manager =
        DeviceManager::new(config.usb.debug_level).context("Failed to initialize USB")?;

    if args.list_devices {
        return list_devices_mode(&manager);
    }

    if config.reset.criteria().is_empty() {
        warn!("No --vendorid or --device given, no device will be reset");
    }

    let summary = reset_matching(&manager, &config, args.dry_run)?;
    report(&summary);
    Ok(())
}

/// List USB devices and exit
fn list_devices_mode(manager: &DeviceManager) -> Result<()> {
    info!("Listing USB devices...");

    let devices = manager.list_devices()?;

    if devices.is_empty() {
        println!("No USB devices found.");
    } else {
        println!("Found {} USB device(s):\n", devices.len());
        for device in devices {
            println!(
                "  {} {} {}",
                device.location(),
                device.device_string(),
                device.describe()
            );
            println!("      Class: {}", device.classify());
            println!("      Speed: {}", device.speed);
        }
    }

    Ok(())
}

fn report(summary: &RunSummary) {
    for (device, error) in summary.failures() {
        warn!("{} was not reset: {}", device, error);
    }
    info!(
        "Done: {} device(s) processed, {} reset, {} failed",
        summary.processed(),
        summary.reset_count(),
        summary.failure_count()
    );
}
