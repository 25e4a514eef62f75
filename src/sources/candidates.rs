//! Candidate identities
//!
//! The detector publishes what it currently sees as a JSON file; each
//! snapshot re-reads it. A missing or unreadable file means "nothing seen".

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::models::{DetectedDevice, IdentityRecord};

/// Read-only view of currently detected identities
pub trait CandidateSource: Send + Sync {
    /// Unordered set of identities that may be impersonated
    fn snapshot(&self) -> Vec<IdentityRecord>;

    /// Same set with whatever detail the source has (RSSI, device type)
    fn devices(&self) -> Vec<DetectedDevice> {
        self.snapshot().into_iter().map(DetectedDevice::from).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
struct DetectorReport {
    #[serde(default)]
    pwnagotchis: HashMap<String, SeenUnit>,
    #[serde(default)]
    flippers: HashMap<String, SeenFlipper>,
}

#[derive(Debug, Deserialize)]
struct SeenUnit {
    name: String,
    rssi: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct SeenFlipper {
    name: String,
    #[serde(rename = "type")]
    device_type: Option<String>,
    rssi: Option<i32>,
}

/// Detector snapshot file (`pwnagotchis` advertise over Wi-Fi, `flippers` over Bluetooth)
#[derive(Debug, Clone)]
pub struct DetectorFile {
    path: PathBuf,
}

impl DetectorFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> DetectorReport {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), "Detector snapshot unavailable: {}", e);
                return DetectorReport::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Malformed detector snapshot: {}", e);
                DetectorReport::default()
            }
        }
    }
}

impl CandidateSource for DetectorFile {
    fn snapshot(&self) -> Vec<IdentityRecord> {
        self.devices().into_iter().map(|d| d.record).collect()
    }

    fn devices(&self) -> Vec<DetectedDevice> {
        let report = self.load();

        let units = report.pwnagotchis.into_values().map(|unit| DetectedDevice {
            record: IdentityRecord::network(unit.name),
            rssi: unit.rssi,
            detector_type: None,
        });
        let flippers = report.flippers.into_values().map(|flipper| DetectedDevice {
            record: IdentityRecord::radio(flipper.name),
            rssi: flipper.rssi,
            detector_type: flipper.device_type,
        });

        units.chain(flippers).collect()
    }
}
