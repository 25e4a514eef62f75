//! GPS location model

use serde::{Deserialize, Serialize};

/// Position snapshot attached to transition log entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    /// Zero unless the fix is 3D
    #[serde(rename = "Altitude")]
    pub altitude: f64,
    #[serde(rename = "Time")]
    pub time: Option<String>,
    #[serde(rename = "Satellites")]
    pub satellites: u32,
}
