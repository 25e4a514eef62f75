//! Linux system driver
//!
//! - Network name: `ssid=` line of hostapd.conf; `systemctl restart <service>`
//!   makes it live
//! - Radio name: `hciconfig <iface> name`
//! - Hardware address / link: `ifconfig <iface> hw ether|down|up`

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

use super::{DeviceIdentityDriver, DriverError, DriverResult, LinkState};
use crate::models::MAX_SSID_BYTES;

// ============================================================================
// CONSTANTS
// ============================================================================

static SSID_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^ssid=.*$").expect("static regex")
});

const STAGING_PREFIX: &str = "spoofr-hostapd.";

// ============================================================================
// DRIVER
// ============================================================================

#[derive(Debug, Clone)]
pub struct SystemDriver {
    wifi_interface: String,
    bluetooth_interface: String,
    hostapd_conf: PathBuf,
    hostapd_service: String,
    use_sudo: bool,
}

impl SystemDriver {
    pub fn new(
        wifi_interface: impl Into<String>,
        bluetooth_interface: impl Into<String>,
        hostapd_conf: impl Into<PathBuf>,
        hostapd_service: impl Into<String>,
        use_sudo: bool,
    ) -> Self {
        Self {
            wifi_interface: wifi_interface.into(),
            bluetooth_interface: bluetooth_interface.into(),
            hostapd_conf: hostapd_conf.into(),
            hostapd_service: hostapd_service.into(),
            use_sudo,
        }
    }

    fn read_hostapd_conf(&self) -> DriverResult<String> {
        fs::read_to_string(&self.hostapd_conf).map_err(|e| io_error(&self.hostapd_conf, e))
    }

    /// Replace hostapd.conf with `content` in a single rename.
    ///
    /// The staging file gets a fresh random name and is created exclusively,
    /// so nothing planted beforehand is followed or overwritten. Without sudo
    /// it sits next to hostapd.conf and is renamed over it; with sudo it is
    /// staged in the temp dir and moved by `sudo mv`.
    fn install_hostapd_conf(&self, content: &str) -> DriverResult<()> {
        let staging_dir = if self.use_sudo {
            std::env::temp_dir()
        } else {
            self.hostapd_conf
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        };

        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".conf")
            .tempfile_in(&staging_dir)
            .map_err(|e| io_error(&staging_dir, e))?;
        let staged_path = staged.path().to_path_buf();
        staged
            .write_all(content.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| io_error(&staged_path, e))?;

        if self.use_sudo {
            // removed on drop if the move did not happen
            let staged = staged.into_temp_path();
            let source = staged.to_string_lossy().to_string();
            let target = self.hostapd_conf.to_string_lossy().to_string();
            self.mutate("mv", &[&source, &target])
        } else {
            staged
                .persist(&self.hostapd_conf)
                .map_err(|e| io_error(&self.hostapd_conf, e.error))?;
            Ok(())
        }
    }

    /// Run a read-only command and return stdout
    fn query(&self, program: &str, args: &[&str]) -> DriverResult<String> {
        run(Command::new(program).args(args), program)
    }

    /// Run a mutating command, through sudo when configured
    fn mutate(&self, program: &str, args: &[&str]) -> DriverResult<()> {
        let mut cmd = if self.use_sudo {
            let mut cmd = Command::new("sudo");
            cmd.arg(program);
            cmd
        } else {
            Command::new(program)
        };
        cmd.args(args);
        run(&mut cmd, program).map(|_| ())
    }
}

impl DeviceIdentityDriver for SystemDriver {
    fn network_name(&self) -> DriverResult<String> {
        let config = self.read_hostapd_conf()?;
        parse_ssid(&config)
            .ok_or_else(|| DriverError::Parse(format!("no ssid= line in {}", self.hostapd_conf.display())))
    }

    fn radio_name(&self) -> DriverResult<String> {
        let output = self.query("hciconfig", &[&self.bluetooth_interface, "name"])?;
        parse_hci_name(&output)
            .ok_or_else(|| DriverError::Parse(format!("no Name: field for {}", self.bluetooth_interface)))
    }

    fn hardware_address(&self) -> DriverResult<Option<String>> {
        let output = self.query("ifconfig", &[&self.wifi_interface])?;
        Ok(parse_ether(&output))
    }

    fn set_network_name(&self, name: &str) -> DriverResult<()> {
        check_single_line(name)?;
        if name.len() > MAX_SSID_BYTES {
            return Err(DriverError::InvalidValue(name.to_string()));
        }

        let config = self.read_hostapd_conf()?;
        self.install_hostapd_conf(&replace_ssid(&config, name))?;

        tracing::info!(ssid = %name, "Wi-Fi SSID written");
        Ok(())
    }

    fn restart_network(&self) -> DriverResult<()> {
        self.mutate("systemctl", &["restart", &self.hostapd_service])?;
        tracing::info!(service = %self.hostapd_service, "Access point restarted");
        Ok(())
    }

    fn set_radio_name(&self, name: &str) -> DriverResult<()> {
        check_single_line(name)?;
        self.mutate("hciconfig", &[&self.bluetooth_interface, "name", name])?;
        tracing::info!(name = %name, "Bluetooth name set");
        Ok(())
    }

    fn set_hardware_address(&self, address: &str) -> DriverResult<()> {
        self.mutate("ifconfig", &[&self.wifi_interface, "hw", "ether", address])
    }

    fn set_link(&self, state: LinkState) -> DriverResult<()> {
        self.mutate("ifconfig", &[&self.wifi_interface, state.as_str()])
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn run(cmd: &mut Command, program: &str) -> DriverResult<String> {
    let output = cmd.output().map_err(|e| DriverError::Spawn {
        command: program.to_string(),
        message: e.to_string(),
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(DriverError::CommandFailed {
            command: program.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

fn io_error(path: &Path, e: io::Error) -> DriverError {
    DriverError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

fn check_single_line(value: &str) -> DriverResult<()> {
    if value.is_empty() || value.contains(['\n', '\r', '\0']) {
        return Err(DriverError::InvalidValue(value.escape_debug().to_string()));
    }
    Ok(())
}

/// Value of the first `ssid=` line
pub(crate) fn parse_ssid(config: &str) -> Option<String> {
    config
        .lines()
        .find_map(|line| line.strip_prefix("ssid="))
        .map(|ssid| ssid.trim().to_string())
}

/// Rewrite every `ssid=` line, appending one if the file has none
pub(crate) fn replace_ssid(config: &str, ssid: &str) -> String {
    let line = format!("ssid={}", ssid);
    if SSID_LINE.is_match(config) {
        SSID_LINE.replace_all(config, NoExpand(&line)).into_owned()
    } else {
        let mut out = config.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&line);
        out.push('\n');
        out
    }
}

/// `Name: 'foo'` line of `hciconfig <iface> name`
pub(crate) fn parse_hci_name(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Name:"))
        .map(|name| name.trim().trim_matches('\'').to_string())
}

/// Address following the `ether` token of `ifconfig <iface>`
pub(crate) fn parse_ether(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        tokens.find(|t| *t == "ether")?;
        tokens.next().map(str::to_string)
    })
}
