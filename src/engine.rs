//! Spoof Engine
//!
//! Owns the original identity captured at startup and the currently active
//! spoof, and is the only place that asks the driver to mutate anything.
//!
//! # Locking
//!
//! - `ops` serializes every decide/apply/revert sequence, including the
//!   revert performed at shutdown.
//! - `status` holds the last committed [`SpoofStatus`]. It is only written
//!   while `ops` is held, and readers (display, status endpoint) never wait
//!   for a driver command to finish.
//!
//! Driver commands run synchronously with no timeout: a hung command stalls
//! later polls and control requests until it returns.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;

use crate::driver::{mac, DeviceIdentityDriver, DriverError, DriverResult, LinkState};
use crate::models::{
    IdentityKind, IdentityRecord, LogEntry, OriginalState, SpoofStatus, StatusSnapshot, StatusView,
};
use crate::presenter;
use crate::recorder::TransitionLog;
use crate::sources::{CandidateSource, LocationProvider};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Minimum time between two polls
    pub poll_interval: Duration,
    /// Advisory hold window reported for the active spoof
    pub hold_duration: Duration,
    /// Kinds that may be impersonated
    pub targets: HashSet<IdentityKind>,
    /// Cycle the Wi-Fi hardware address along with the SSID
    pub randomize_mac: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SpoofError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("Spoofing has been stopped")]
    Stopped,
}

/// What a poll did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Called again before the poll interval elapsed
    RateLimited,
    /// Engine has shut down
    Stopped,
    /// No candidates and nothing to revert
    Idle,
    /// No candidates, active spoof reverted
    Reverted,
    /// Chosen candidate is already active
    Unchanged,
    Applied(IdentityRecord),
    ApplyFailed(IdentityRecord),
}

struct OpState {
    last_poll: Option<Instant>,
    stopped: bool,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct SpoofEngine {
    settings: EngineSettings,
    original: OriginalState,
    driver: Arc<dyn DeviceIdentityDriver>,
    candidates: Arc<dyn CandidateSource>,
    location: Arc<dyn LocationProvider>,
    log: TransitionLog,
    ops: Mutex<OpState>,
    status: RwLock<SpoofStatus>,
}

impl SpoofEngine {
    /// Capture the original identity and build the engine.
    ///
    /// Nothing is mutated here. Fields that cannot be read are left unknown
    /// and will not be restored.
    pub fn initialize(
        settings: EngineSettings,
        driver: Arc<dyn DeviceIdentityDriver>,
        candidates: Arc<dyn CandidateSource>,
        location: Arc<dyn LocationProvider>,
        log: TransitionLog,
    ) -> Self {
        let original = capture_original(driver.as_ref());
        tracing::info!(
            ssid = ?original.network_name,
            bt = ?original.radio_name,
            mac = ?original.hardware_address,
            "Original settings captured"
        );

        Self {
            settings,
            original,
            driver,
            candidates,
            location,
            log,
            ops: Mutex::new(OpState { last_poll: None, stopped: false }),
            status: RwLock::new(SpoofStatus::default()),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn original(&self) -> &OriginalState {
        &self.original
    }

    // ------------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------------

    /// Poll using the injected candidate source.
    ///
    /// The source is not consulted when the call is rate limited.
    pub fn tick(&self) -> PollOutcome {
        let mut ops = self.ops.lock();
        if let Some(outcome) = self.gate(&mut ops) {
            return outcome;
        }

        let candidates = self.candidates.snapshot();
        self.decide_locked(&candidates)
    }

    /// Pick a candidate and make it the active spoof
    pub fn poll(&self, candidates: &[IdentityRecord]) -> PollOutcome {
        let mut ops = self.ops.lock();
        if let Some(outcome) = self.gate(&mut ops) {
            return outcome;
        }

        self.decide_locked(candidates)
    }

    fn gate(&self, ops: &mut OpState) -> Option<PollOutcome> {
        if ops.stopped {
            return Some(PollOutcome::Stopped);
        }

        let now = Instant::now();
        if let Some(last) = ops.last_poll {
            if now.duration_since(last) < self.settings.poll_interval {
                return Some(PollOutcome::RateLimited);
            }
        }
        ops.last_poll = Some(now);
        None
    }

    /// Caller holds `ops`
    fn decide_locked(&self, candidates: &[IdentityRecord]) -> PollOutcome {
        let eligible: Vec<&IdentityRecord> = candidates
            .iter()
            .filter(|c| self.settings.targets.contains(&c.kind))
            .collect();

        let Some(chosen) = eligible.choose(&mut rand::thread_rng()).map(|c| (*c).clone()) else {
            return match self.revert_locked() {
                Ok(false) => PollOutcome::Idle,
                Ok(true) => PollOutcome::Reverted,
                Err(e) => {
                    tracing::error!("Failed to revert spoof: {}", e);
                    PollOutcome::Reverted
                }
            };
        };

        if self.status.read().active.as_ref() == Some(&chosen) {
            return PollOutcome::Unchanged;
        }

        if let Err(e) = self.revert_locked() {
            tracing::error!("Failed to revert spoof: {}", e);
        }

        match self.apply_locked(&chosen) {
            Ok(()) => {
                self.commit(Some(chosen.clone()));
                self.log_transition();
                PollOutcome::Applied(chosen)
            }
            Err(e) => {
                tracing::error!(identity = %chosen, "Failed to spoof: {}", e);
                PollOutcome::ApplyFailed(chosen)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Manual control
    // ------------------------------------------------------------------------

    /// Spoof `record` right away, whether or not it is a detected candidate
    pub fn manual_spoof(&self, record: IdentityRecord) -> Result<(), SpoofError> {
        let ops = self.ops.lock();
        if ops.stopped {
            return Err(SpoofError::Stopped);
        }

        if let Err(e) = self.revert_locked() {
            tracing::error!("Failed to revert spoof: {}", e);
        }

        if let Err(e) = self.apply_locked(&record) {
            tracing::error!(identity = %record, "Failed to spoof: {}", e);
            return Err(e.into());
        }

        self.commit(Some(record));
        self.log_transition();
        Ok(())
    }

    /// Restore the original identity. `Ok(false)` if nothing was active.
    pub fn manual_revert(&self) -> Result<bool, SpoofError> {
        let _ops = self.ops.lock();
        Ok(self.revert_locked()?)
    }

    /// Stop for good: no poll or manual spoof applies anything afterward
    pub fn shutdown(&self) -> DriverResult<bool> {
        let mut ops = self.ops.lock();
        ops.stopped = true;
        self.revert_locked()
    }

    // ------------------------------------------------------------------------
    // Apply / revert
    // ------------------------------------------------------------------------

    /// Caller holds `ops`.
    ///
    /// A network spoof only counts once the access point has restarted; if the
    /// restart fails the written SSID and address are rolled back.
    fn apply_locked(&self, record: &IdentityRecord) -> DriverResult<()> {
        self.set_name(record.kind, &record.name)?;

        if record.kind == IdentityKind::Network {
            if self.settings.randomize_mac {
                let address = mac::random_mac();
                match self.cycle_hardware_address(&address) {
                    Ok(()) => tracing::info!(mac = %address, "Hardware address randomized"),
                    // the name change stands
                    Err(e) => tracing::warn!("Failed to randomize hardware address: {}", e),
                }
            }

            // after the address change, so the AP comes up on the final address
            if let Err(e) = self.driver.restart_network() {
                self.roll_back_network();
                return Err(e);
            }
        }

        tracing::info!("Spoofed {} name to {}", record.kind.title(), record.name);
        Ok(())
    }

    /// Undo the driver side of a network spoof that never went live
    fn roll_back_network(&self) {
        match self.original.name_for(IdentityKind::Network) {
            Some(name) => {
                if let Err(e) = self.driver.set_network_name(name) {
                    tracing::error!("Failed to roll back SSID: {}", e);
                }
            }
            None => tracing::warn!("Original SSID unknown, spoofed SSID left in place"),
        }

        if self.settings.randomize_mac {
            if let Some(address) = &self.original.hardware_address {
                if let Err(e) = self.cycle_hardware_address(address) {
                    tracing::error!("Failed to roll back hardware address: {}", e);
                }
            }
        }
    }

    /// Caller holds `ops`.
    ///
    /// `active` is cleared even if restoring fails; the device may then still
    /// show the spoofed identity.
    fn revert_locked(&self) -> DriverResult<bool> {
        let Some(active) = self.status.read().active.clone() else {
            return Ok(false);
        };

        let result = self.restore(&active);
        self.commit(None);

        match &result {
            Ok(()) => tracing::info!(from = %active, "Reverted to original settings"),
            Err(e) => tracing::error!(from = %active, "Revert incomplete: {}", e),
        }
        result.map(|()| true)
    }

    fn restore(&self, active: &IdentityRecord) -> DriverResult<()> {
        let mut touched = false;
        let name_result = match self.original.name_for(active.kind) {
            Some(name) => {
                touched = true;
                self.set_name(active.kind, name)
            }
            None => {
                tracing::warn!("Original {} name unknown, leaving {} in place", active.kind, active.name);
                Ok(())
            }
        };

        if active.kind == IdentityKind::Radio {
            return name_result;
        }

        let mac_result = if self.settings.randomize_mac {
            match &self.original.hardware_address {
                Some(address) => {
                    touched = true;
                    self.cycle_hardware_address(address)
                }
                None => {
                    tracing::warn!("Original hardware address unknown, not restoring");
                    Ok(())
                }
            }
        } else {
            Ok(())
        };

        let restart_result = if touched {
            self.driver.restart_network()
        } else {
            Ok(())
        };

        name_result.and(mac_result).and(restart_result)
    }

    fn set_name(&self, kind: IdentityKind, name: &str) -> DriverResult<()> {
        match kind {
            IdentityKind::Network => self.driver.set_network_name(name),
            IdentityKind::Radio => self.driver.set_radio_name(name),
        }
    }

    /// Link down, set address, link up. Link up is attempted even if the
    /// address change failed.
    fn cycle_hardware_address(&self, address: &str) -> DriverResult<()> {
        self.driver.set_link(LinkState::Down)?;
        let set = self.driver.set_hardware_address(address);
        let up = self.driver.set_link(LinkState::Up);
        set.and(up)
    }

    fn commit(&self, active: Option<IdentityRecord>) {
        let mut status = self.status.write();
        if active.is_some() {
            status.last_applied_at = Some(Local::now());
        }
        status.active = active;
    }

    /// Append the current spoof to the transition log
    fn log_transition(&self) {
        let gps = if self.location.is_ready() {
            self.location.current_fix()
        } else {
            None
        };

        let entry = LogEntry::new(Local::now(), self.status.read().active.clone(), gps);
        if let Err(e) = self.log.append(&entry) {
            tracing::error!(path = ?self.log.path(), "{}", e);
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Last committed status
    pub fn status(&self) -> SpoofStatus {
        self.status.read().clone()
    }

    pub fn status_text(&self) -> String {
        presenter::render(&self.status.read())
    }

    /// Status, detected candidates and location for the control endpoint
    pub fn snapshot(&self) -> StatusSnapshot {
        let status = self.status();
        let hold_until = status
            .active
            .as_ref()
            .and(status.last_applied_at)
            .and_then(|at| chrono::Duration::from_std(self.settings.hold_duration).ok().map(|d| at + d));

        let gps = if self.location.is_ready() {
            self.location.current_fix()
        } else {
            None
        };

        StatusSnapshot {
            status: StatusView {
                display_text: presenter::render(&status),
                active: status.active,
                last_applied_at: status.last_applied_at,
                hold_until,
            },
            original: self.original.clone(),
            candidates: self.candidates.devices(),
            gps,
        }
    }
}

fn capture_original(driver: &dyn DeviceIdentityDriver) -> OriginalState {
    let network_name = driver
        .network_name()
        .map_err(|e| tracing::warn!("Could not read original SSID: {}", e))
        .ok();
    let radio_name = driver
        .radio_name()
        .map_err(|e| tracing::warn!("Could not read original Bluetooth name: {}", e))
        .ok();
    let hardware_address = driver
        .hardware_address()
        .map_err(|e| tracing::warn!("Could not read original hardware address: {}", e))
        .ok()
        .flatten();

    OriginalState {
        network_name,
        radio_name,
        hardware_address,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SystemDriver;
    use crate::recorder::read_entries;
    use crate::testing::{settings, DriverCall, FixedLocation, MockDriver, StaticCandidates};
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Harness {
        engine: SpoofEngine,
        driver: Arc<MockDriver>,
        candidates: Arc<StaticCandidates>,
        log_path: PathBuf,
        _dir: TempDir,
    }

    fn harness_with(driver: MockDriver, settings: EngineSettings) -> Harness {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("spoofr.json");
        let driver = Arc::new(driver);
        let candidates = Arc::new(StaticCandidates::default());

        let engine = SpoofEngine::initialize(
            settings,
            driver.clone(),
            candidates.clone(),
            Arc::new(FixedLocation(None)),
            TransitionLog::open(&log_path),
        );

        Harness { engine, driver, candidates, log_path, _dir: dir }
    }

    fn harness() -> Harness {
        harness_with(MockDriver::new(), settings())
    }

    #[test]
    fn test_original_captured_before_any_mutation() {
        let h = harness();

        assert_eq!(h.driver.calls(), vec![
            DriverCall::Read("network_name"),
            DriverCall::Read("radio_name"),
            DriverCall::Read("hardware_address"),
        ]);
        assert!(h.engine.original().is_complete());
        assert_eq!(h.engine.original().network_name.as_deref(), Some("pwnagotchi"));
    }

    #[test]
    fn test_partial_capture_is_not_fatal() {
        let h = harness_with(MockDriver::unreadable(), settings());

        assert_eq!(h.engine.original(), &OriginalState::default());

        // spoof works, revert skips the unknown field
        h.engine.poll(&[IdentityRecord::network("unitA")]);
        h.driver.clear();
        assert_eq!(h.engine.manual_revert().unwrap(), true);
        assert_eq!(h.driver.mutation_count(), 0);
        assert!(h.engine.status().active.is_none());
    }

    #[test]
    fn test_revert_when_idle_is_noop() {
        let h = harness();
        h.driver.clear();

        assert_eq!(h.engine.manual_revert().unwrap(), false);
        assert_eq!(h.engine.manual_revert().unwrap(), false);

        assert!(h.driver.calls().is_empty());
        assert!(read_entries(&h.log_path).is_empty());
    }

    #[test]
    fn test_unchanged_candidate_is_applied_once() {
        let h = harness();
        h.driver.clear();
        let candidates = [IdentityRecord::network("unitA")];

        assert_eq!(h.engine.poll(&candidates), PollOutcome::Applied(IdentityRecord::network("unitA")));
        assert_eq!(h.driver.calls(), vec![
            DriverCall::SetNetworkName("unitA".into()),
            DriverCall::RestartNetwork,
        ]);
        assert_eq!(h.engine.status().active, Some(IdentityRecord::network("unitA")));
        assert_eq!(read_entries(&h.log_path).len(), 1);

        assert_eq!(h.engine.poll(&candidates), PollOutcome::Unchanged);
        assert_eq!(h.driver.mutation_count(), 2);
        assert_eq!(read_entries(&h.log_path).len(), 1);
    }

    #[test]
    fn test_empty_candidates_revert_once() {
        let h = harness();
        h.engine.poll(&[IdentityRecord::network("unitA")]);
        h.driver.clear();

        assert_eq!(h.engine.poll(&[]), PollOutcome::Reverted);
        assert_eq!(h.driver.calls(), vec![
            DriverCall::SetNetworkName("pwnagotchi".into()),
            DriverCall::RestartNetwork,
        ]);
        assert!(h.engine.status().active.is_none());

        assert_eq!(h.engine.poll(&[]), PollOutcome::Idle);
        assert_eq!(h.driver.mutation_count(), 2);
    }

    #[test]
    fn test_disabled_kinds_are_filtered() {
        let mut s = settings();
        s.targets = HashSet::from([IdentityKind::Radio]);
        let h = harness_with(MockDriver::new(), s);
        h.driver.clear();

        assert_eq!(h.engine.poll(&[IdentityRecord::network("unitA")]), PollOutcome::Idle);
        assert!(h.driver.calls().is_empty());

        assert_eq!(
            h.engine.poll(&[IdentityRecord::network("unitA"), IdentityRecord::radio("flip1")]),
            PollOutcome::Applied(IdentityRecord::radio("flip1"))
        );
    }

    #[test]
    fn test_failed_apply_leaves_inactive() {
        let h = harness();
        h.driver.fail("set_network_name");

        let outcome = h.engine.poll(&[IdentityRecord::network("unitA")]);

        assert_eq!(outcome, PollOutcome::ApplyFailed(IdentityRecord::network("unitA")));
        assert!(h.engine.status().active.is_none());
        assert!(read_entries(&h.log_path).is_empty());
        assert_eq!(h.engine.status_text(), "Spoof: None");
    }

    #[test]
    fn test_failed_apply_after_active_spoof() {
        let h = harness();
        h.engine.poll(&[IdentityRecord::network("unitA")]);
        h.driver.fail("set_radio_name");
        h.driver.clear();

        let outcome = h.engine.poll(&[IdentityRecord::radio("flip1")]);

        assert_eq!(outcome, PollOutcome::ApplyFailed(IdentityRecord::radio("flip1")));
        // previous spoof was reverted before the failed attempt
        assert_eq!(h.driver.calls()[0], DriverCall::SetNetworkName("pwnagotchi".into()));
        assert!(h.engine.status().active.is_none());
    }

    #[test]
    fn test_mac_cycled_before_access_point_restart() {
        let mut s = settings();
        s.randomize_mac = true;
        let h = harness_with(MockDriver::new(), s);
        h.driver.clear();

        h.engine.poll(&[IdentityRecord::network("unitA")]);
        let calls = h.driver.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], DriverCall::SetNetworkName("unitA".into()));
        assert_eq!(calls[1], DriverCall::SetLink(LinkState::Down));
        assert!(matches!(&calls[2], DriverCall::SetHardwareAddress(a) if a != "b8:27:eb:00:00:01"));
        assert_eq!(calls[3], DriverCall::SetLink(LinkState::Up));
        assert_eq!(calls[4], DriverCall::RestartNetwork);

        h.driver.clear();
        h.engine.manual_revert().unwrap();
        assert_eq!(h.driver.calls(), vec![
            DriverCall::SetNetworkName("pwnagotchi".into()),
            DriverCall::SetLink(LinkState::Down),
            DriverCall::SetHardwareAddress("b8:27:eb:00:00:01".into()),
            DriverCall::SetLink(LinkState::Up),
            DriverCall::RestartNetwork,
        ]);
    }

    #[test]
    fn test_failed_restart_rolls_back_network() {
        let mut s = settings();
        s.randomize_mac = true;
        let h = harness_with(MockDriver::new(), s);
        h.driver.fail("restart_network");
        h.driver.clear();

        let outcome = h.engine.poll(&[IdentityRecord::network("unitA")]);

        assert_eq!(outcome, PollOutcome::ApplyFailed(IdentityRecord::network("unitA")));
        assert!(h.engine.status().active.is_none());
        assert!(read_entries(&h.log_path).is_empty());

        let calls = h.driver.calls();
        assert_eq!(calls[4], DriverCall::RestartNetwork);
        assert_eq!(&calls[5..], &[
            DriverCall::SetNetworkName("pwnagotchi".into()),
            DriverCall::SetLink(LinkState::Down),
            DriverCall::SetHardwareAddress("b8:27:eb:00:00:01".into()),
            DriverCall::SetLink(LinkState::Up),
        ]);
    }

    #[test]
    fn test_failed_restart_keeps_original_hostapd_conf() {
        let dir = TempDir::new().unwrap();
        let conf = dir.path().join("hostapd.conf");
        std::fs::write(&conf, "interface=wlan0\nssid=pwnagotchi\n").unwrap();

        // no such unit, so the restart always fails
        let driver = SystemDriver::new("wlan0", "hci0", &conf, "spoofr-missing-unit.service", false);
        let engine = SpoofEngine::initialize(
            settings(),
            Arc::new(driver.clone()),
            Arc::new(StaticCandidates::default()),
            Arc::new(FixedLocation(None)),
            TransitionLog::disabled(),
        );

        let outcome = engine.poll(&[IdentityRecord::network("unitA")]);
        assert_eq!(outcome, PollOutcome::ApplyFailed(IdentityRecord::network("unitA")));
        assert!(engine.status().active.is_none());
        assert_eq!(driver.network_name().unwrap(), "pwnagotchi");

        assert_eq!(engine.shutdown().unwrap(), false);
        assert_eq!(std::fs::read_to_string(&conf).unwrap(), "interface=wlan0\nssid=pwnagotchi\n");
    }

    #[test]
    fn test_radio_spoof_leaves_mac_alone() {
        let mut s = settings();
        s.randomize_mac = true;
        let h = harness_with(MockDriver::new(), s);
        h.driver.clear();

        h.engine.poll(&[IdentityRecord::radio("flip1")]);
        h.engine.manual_revert().unwrap();

        assert_eq!(h.driver.calls(), vec![
            DriverCall::SetRadioName("flip1".into()),
            DriverCall::SetRadioName("pwnagotchi".into()),
        ]);
    }

    #[test]
    fn test_mac_failure_keeps_name_change() {
        let mut s = settings();
        s.randomize_mac = true;
        let h = harness_with(MockDriver::new(), s);
        h.driver.fail("set_hardware_address");
        h.driver.clear();

        let outcome = h.engine.poll(&[IdentityRecord::network("unitA")]);

        assert_eq!(outcome, PollOutcome::Applied(IdentityRecord::network("unitA")));
        assert_eq!(h.engine.status().active, Some(IdentityRecord::network("unitA")));
        // interface brought back up anyway, then the access point restarted
        let calls = h.driver.calls();
        assert_eq!(&calls[calls.len() - 2..], &[
            DriverCall::SetLink(LinkState::Up),
            DriverCall::RestartNetwork,
        ]);
    }

    #[test]
    fn test_revert_failure_still_clears_active() {
        let h = harness();
        h.engine.poll(&[IdentityRecord::network("unitA")]);
        h.driver.fail("set_network_name");

        assert!(h.engine.manual_revert().is_err());
        assert!(h.engine.status().active.is_none());

        // no retry storm: a second revert does nothing
        h.driver.clear();
        assert_eq!(h.engine.manual_revert().unwrap(), false);
        assert!(h.driver.calls().is_empty());
    }

    #[test]
    fn test_rate_limited_poll_is_noop() {
        let mut s = settings();
        s.poll_interval = Duration::from_secs(3600);
        let h = harness_with(MockDriver::new(), s);
        h.driver.clear();

        h.engine.poll(&[IdentityRecord::network("unitA")]);
        assert_eq!(h.engine.poll(&[IdentityRecord::radio("flip1")]), PollOutcome::RateLimited);
        assert_eq!(h.engine.poll(&[]), PollOutcome::RateLimited);

        assert_eq!(h.driver.mutation_count(), 2);
        assert_eq!(h.engine.status().active, Some(IdentityRecord::network("unitA")));
    }

    #[test]
    fn test_tick_uses_candidate_source() {
        let h = harness();
        h.candidates.set(vec![IdentityRecord::radio("flip1")]);

        assert_eq!(h.engine.tick(), PollOutcome::Applied(IdentityRecord::radio("flip1")));

        h.candidates.set(vec![]);
        assert_eq!(h.engine.tick(), PollOutcome::Reverted);
    }

    #[test]
    fn test_manual_spoof_replaces_active() {
        let h = harness();
        h.engine.poll(&[IdentityRecord::network("unitA")]);
        h.driver.clear();

        h.engine.manual_spoof(IdentityRecord::radio("flip1")).unwrap();

        assert_eq!(h.driver.calls(), vec![
            DriverCall::SetNetworkName("pwnagotchi".into()),
            DriverCall::RestartNetwork,
            DriverCall::SetRadioName("flip1".into()),
        ]);
        assert_eq!(h.engine.status().active, Some(IdentityRecord::radio("flip1")));

        let entries = read_entries(&h.log_path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].spoof, Some(IdentityRecord::radio("flip1")));
    }

    #[test]
    fn test_manual_spoof_failure() {
        let h = harness();
        h.driver.fail("set_radio_name");

        let err = h.engine.manual_spoof(IdentityRecord::radio("flip1")).unwrap_err();
        assert!(matches!(err, SpoofError::Driver(_)));
        assert!(h.engine.status().active.is_none());
    }

    #[test]
    fn test_shutdown_reverts_and_blocks_reapply() {
        let h = harness();
        h.engine.poll(&[IdentityRecord::network("unitA")]);
        h.driver.clear();

        assert_eq!(h.engine.shutdown().unwrap(), true);
        assert_eq!(h.driver.calls(), vec![
            DriverCall::SetNetworkName("pwnagotchi".into()),
            DriverCall::RestartNetwork,
        ]);

        h.driver.clear();
        assert_eq!(h.engine.poll(&[IdentityRecord::network("unitB")]), PollOutcome::Stopped);
        assert!(matches!(h.engine.manual_spoof(IdentityRecord::radio("x")), Err(SpoofError::Stopped)));
        assert!(h.driver.calls().is_empty());
        assert!(h.engine.status().active.is_none());
    }

    #[test]
    fn test_active_is_always_a_current_candidate() {
        let h = harness();
        let sets = [
            vec![IdentityRecord::network("a"), IdentityRecord::network("b"), IdentityRecord::radio("c")],
            vec![IdentityRecord::radio("c")],
            vec![],
            vec![IdentityRecord::network("a"), IdentityRecord::radio("d")],
        ];

        for round in 0..20 {
            let set = &sets[round % sets.len()];
            h.engine.poll(set);
            match h.engine.status().active {
                Some(active) => assert!(set.contains(&active)),
                None => assert!(set.is_empty()),
            }
        }
    }

    #[test]
    fn test_log_entry_carries_location() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("spoofr.json");
        let fix = crate::models::LocationSnapshot {
            latitude: 1.5,
            longitude: 2.5,
            altitude: 0.0,
            time: None,
            satellites: 5,
        };
        let engine = SpoofEngine::initialize(
            settings(),
            Arc::new(MockDriver::new()),
            Arc::new(StaticCandidates::default()),
            Arc::new(FixedLocation(Some(fix.clone()))),
            TransitionLog::open(&log_path),
        );

        engine.poll(&[IdentityRecord::radio("flip1")]);

        let entries = read_entries(&log_path);
        assert_eq!(entries[0].gps, Some(fix));
    }

    #[test]
    fn test_snapshot() {
        let mut s = settings();
        s.hold_duration = Duration::from_secs(300);
        let h = harness_with(MockDriver::new(), s);
        h.candidates.set(vec![IdentityRecord::network("unitA")]);
        h.engine.tick();

        let snapshot = h.engine.snapshot();
        assert_eq!(snapshot.status.display_text, "Spoof: unitA\nWifi");
        assert_eq!(snapshot.candidates.len(), 1);
        assert!(snapshot.gps.is_none());

        let applied = snapshot.status.last_applied_at.unwrap();
        assert_eq!(snapshot.status.hold_until, Some(applied + chrono::Duration::seconds(300)));
    }
}
