//! Test doubles for the engine's collaborators

use std::collections::HashSet;
use std::time::Duration;

use parking_lot::Mutex;

use crate::driver::{DeviceIdentityDriver, DriverError, DriverResult, LinkState};
use crate::engine::EngineSettings;
use crate::models::{IdentityKind, IdentityRecord, LocationSnapshot};
use crate::sources::{CandidateSource, LocationProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Read(&'static str),
    SetNetworkName(String),
    RestartNetwork,
    SetRadioName(String),
    SetHardwareAddress(String),
    SetLink(LinkState),
}

/// Records every call; any operation can be made to fail
pub struct MockDriver {
    network_name: Option<String>,
    radio_name: Option<String>,
    hardware_address: Option<String>,
    calls: Mutex<Vec<DriverCall>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            network_name: Some("pwnagotchi".into()),
            radio_name: Some("pwnagotchi".into()),
            hardware_address: Some("b8:27:eb:00:00:01".into()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Every read accessor fails
    pub fn unreadable() -> Self {
        Self {
            network_name: None,
            radio_name: None,
            hardware_address: None,
            ..Self::new()
        }
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().insert(op);
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| !matches!(c, DriverCall::Read(_)))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, op: &'static str, call: DriverCall) -> DriverResult<()> {
        self.calls.lock().push(call);
        if self.failing.lock().contains(op) {
            return Err(DriverError::CommandFailed {
                command: op.to_string(),
                exit_code: 1,
                stderr: "mock failure".to_string(),
            });
        }
        Ok(())
    }

    fn read(&self, op: &'static str, value: &Option<String>) -> DriverResult<String> {
        self.record(op, DriverCall::Read(op))?;
        value.clone().ok_or_else(|| DriverError::Parse(format!("{} unavailable", op)))
    }
}

impl DeviceIdentityDriver for MockDriver {
    fn network_name(&self) -> DriverResult<String> {
        self.read("network_name", &self.network_name)
    }

    fn radio_name(&self) -> DriverResult<String> {
        self.read("radio_name", &self.radio_name)
    }

    fn hardware_address(&self) -> DriverResult<Option<String>> {
        self.read("hardware_address", &self.hardware_address).map(Some)
    }

    fn set_network_name(&self, name: &str) -> DriverResult<()> {
        self.record("set_network_name", DriverCall::SetNetworkName(name.to_string()))
    }

    fn restart_network(&self) -> DriverResult<()> {
        self.record("restart_network", DriverCall::RestartNetwork)
    }

    fn set_radio_name(&self, name: &str) -> DriverResult<()> {
        self.record("set_radio_name", DriverCall::SetRadioName(name.to_string()))
    }

    fn set_hardware_address(&self, address: &str) -> DriverResult<()> {
        self.record("set_hardware_address", DriverCall::SetHardwareAddress(address.to_string()))
    }

    fn set_link(&self, state: LinkState) -> DriverResult<()> {
        self.record("set_link", DriverCall::SetLink(state))
    }
}

#[derive(Default)]
pub struct StaticCandidates {
    records: Mutex<Vec<IdentityRecord>>,
}

impl StaticCandidates {
    pub fn set(&self, records: Vec<IdentityRecord>) {
        *self.records.lock() = records;
    }
}

impl CandidateSource for StaticCandidates {
    fn snapshot(&self) -> Vec<IdentityRecord> {
        self.records.lock().clone()
    }
}

/// Always ready, always returns the same fix
pub struct FixedLocation(pub Option<LocationSnapshot>);

impl LocationProvider for FixedLocation {
    fn is_ready(&self) -> bool {
        true
    }

    fn current_fix(&self) -> Option<LocationSnapshot> {
        self.0.clone()
    }
}

/// Both kinds enabled, no rate limit, no MAC cycling
pub fn settings() -> EngineSettings {
    EngineSettings {
        poll_interval: Duration::ZERO,
        hold_duration: Duration::from_secs(300),
        targets: HashSet::from(IdentityKind::ALL),
        randomize_mac: false,
    }
}
