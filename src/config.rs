//! Configuration module
//!
//! Every option comes from a `SPOOFR_*` environment variable (a `.env` file
//! is loaded first). Invalid values are logged and replaced by the default.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::EngineSettings;
use crate::models::IdentityKind;
use crate::presenter::{FontSize, StatusWidget};

const DEFAULT_UI_POSITION: (i32, i32) = (0, 120);

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Run the spoofer at all
    pub enabled: bool,

    /// Identity kinds that may be spoofed
    pub targets: HashSet<IdentityKind>,

    /// Advisory hold time for a spoof, in seconds
    pub spoof_duration_secs: u64,

    /// Randomize the Wi-Fi hardware address when spoofing an SSID
    pub randomize_mac: bool,

    /// Display position of the status text
    pub ui_position: (i32, i32),

    pub font_size: FontSize,

    /// Transition log (JSONL). Empty disables logging.
    pub log_file: PathBuf,

    pub gps_enabled: bool,
    pub gpsd_host: String,
    pub gpsd_port: u16,

    /// Seconds between spoof updates
    pub check_interval_secs: u64,

    /// Seconds between display refreshes
    pub display_refresh_secs: u64,

    pub bluetooth_interface: String,
    pub wifi_interface: String,
    pub hostapd_conf: PathBuf,

    /// systemd unit restarted to apply a new SSID
    pub hostapd_service: String,

    /// Prefix mutating commands with sudo
    pub use_sudo: bool,

    /// Detector snapshot file
    pub candidates_file: PathBuf,

    /// Control endpoint port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            enabled: parse_or(&lookup, "SPOOFR_ENABLED", false, parse_bool),
            targets: parse_or(&lookup, "SPOOFR_TARGETS", HashSet::from(IdentityKind::ALL), parse_targets),
            spoof_duration_secs: parse_or(&lookup, "SPOOFR_SPOOF_DURATION", 300, u64::from_str),
            randomize_mac: parse_or(&lookup, "SPOOFR_RANDOMIZE_MAC", true, parse_bool),
            ui_position: parse_or(&lookup, "SPOOFR_UI_POSITION", DEFAULT_UI_POSITION, parse_position),
            font_size: parse_or(&lookup, "SPOOFR_FONT_SIZE", FontSize::Small, FontSize::from_str),
            log_file: PathBuf::from(text("SPOOFR_LOG_FILE", "/var/log/spoofr.json")),
            gps_enabled: parse_or(&lookup, "SPOOFR_GPS_ENABLED", false, parse_bool),
            gpsd_host: text("SPOOFR_GPSD_HOST", "127.0.0.1"),
            gpsd_port: parse_or(&lookup, "SPOOFR_GPSD_PORT", 2947, u16::from_str),
            check_interval_secs: parse_or(&lookup, "SPOOFR_CHECK_INTERVAL", 60, parse_period),
            display_refresh_secs: parse_or(&lookup, "SPOOFR_DISPLAY_REFRESH", 2, parse_period),
            bluetooth_interface: text("SPOOFR_BLUETOOTH_INTERFACE", "hci0"),
            wifi_interface: text("SPOOFR_WIFI_INTERFACE", "wlan0"),
            hostapd_conf: PathBuf::from(text("SPOOFR_HOSTAPD_CONF", "/etc/hostapd/hostapd.conf")),
            hostapd_service: text("SPOOFR_HOSTAPD_SERVICE", "hostapd"),
            use_sudo: parse_or(&lookup, "SPOOFR_USE_SUDO", true, parse_bool),
            candidates_file: PathBuf::from(text("SPOOFR_CANDIDATES_FILE", "/tmp/pwn_detector.json")),
            port: parse_or(&lookup, "PORT", 8080, u16::from_str),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            poll_interval: Duration::from_secs(self.check_interval_secs),
            hold_duration: Duration::from_secs(self.spoof_duration_secs),
            targets: self.targets.clone(),
            randomize_mac: self.randomize_mac,
        }
    }

    pub fn widget(&self) -> StatusWidget {
        StatusWidget {
            position: self.ui_position,
            font: self.font_size,
        }
    }
}

/// Parse `key` if set; keep `default` (with a warning) if the value is invalid
fn parse_or<T, E: std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Result<T, E>,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => match parse(raw.trim()) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Invalid {}={:?} ({}), using default", key, raw, e);
                default
            }
        },
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("'{}' is not a boolean", other)),
    }
}

/// Whole seconds, at least 1
fn parse_period(raw: &str) -> Result<u64, String> {
    match raw.parse::<u64>() {
        Ok(0) => Err("interval must be at least 1 second".to_string()),
        Ok(secs) => Ok(secs),
        Err(e) => Err(e.to_string()),
    }
}

/// `x,y`, optionally bracketed: `[0, 120]`
fn parse_position(raw: &str) -> Result<(i32, i32), String> {
    let inner = raw.trim_start_matches(['[', '(']).trim_end_matches([']', ')']);
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [x, y] => {
            let x = x.parse::<i32>().map_err(|e| e.to_string())?;
            let y = y.parse::<i32>().map_err(|e| e.to_string())?;
            Ok((x, y))
        }
        _ => Err("expected two coordinates".to_string()),
    }
}

/// Comma-separated kinds; unknown entries are skipped, none valid is an error
fn parse_targets(raw: &str) -> Result<HashSet<IdentityKind>, String> {
    let mut targets = HashSet::new();
    for label in raw.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        match label.parse::<IdentityKind>() {
            Ok(kind) => {
                targets.insert(kind);
            }
            Err(e) => tracing::warn!("Ignoring spoof target: {}", e),
        }
    }

    if targets.is_empty() {
        Err("no valid spoof target".to_string())
    } else {
        Ok(targets)
    }
}
