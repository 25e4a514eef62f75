//! Control endpoint request/response types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{IdentityKind, IdentityRecord, LocationSnapshot, OriginalState, MAX_SSID_BYTES};

/// Raw POST body, before validation
#[derive(Debug, Deserialize, Validate)]
pub struct ControlRequest {
    pub action: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[validate(length(min = 1, max = 32, message = "name must be 1-32 characters"))]
    pub name: Option<String>,
}

/// Rejected control payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidControlRequest(pub String);

/// Validated control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Revert,
    Spoof(IdentityRecord),
}

impl ControlCommand {
    /// Parse and validate a POST body
    pub fn parse(body: &[u8]) -> Result<Self, InvalidControlRequest> {
        let req: ControlRequest = serde_json::from_slice(body)
            .map_err(|e| InvalidControlRequest(format!("Invalid JSON body: {}", e)))?;
        Self::try_from(req)
    }
}

impl TryFrom<ControlRequest> for ControlCommand {
    type Error = InvalidControlRequest;

    fn try_from(req: ControlRequest) -> Result<Self, Self::Error> {
        match req.action.as_deref() {
            Some("revert") => Ok(ControlCommand::Revert),
            Some("spoof") => {
                req.validate()
                    .map_err(|e| InvalidControlRequest(e.to_string()))?;

                let kind = req.kind
                    .ok_or_else(|| InvalidControlRequest("Missing 'type'".to_string()))?;
                let name = req.name
                    .ok_or_else(|| InvalidControlRequest("Missing 'name'".to_string()))?;
                let kind: IdentityKind = kind
                    .parse()
                    .map_err(|e: super::UnknownKind| InvalidControlRequest(e.to_string()))?;

                if kind == IdentityKind::Network && name.len() > MAX_SSID_BYTES {
                    return Err(InvalidControlRequest(format!(
                        "SSID must be at most {} bytes",
                        MAX_SSID_BYTES
                    )));
                }

                Ok(ControlCommand::Spoof(IdentityRecord::new(kind, name)))
            }
            Some(other) => Err(InvalidControlRequest(format!("Unknown action '{}'", other))),
            None => Err(InvalidControlRequest("Missing 'action'".to_string())),
        }
    }
}

/// Successful control response body
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub status: &'static str,
}

impl ControlResponse {
    pub fn success() -> Self {
        Self { status: "success" }
    }
}

/// A detected device as shown on the status page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedDevice {
    #[serde(flatten)]
    pub record: IdentityRecord,
    pub rssi: Option<i32>,
    /// Device type as reported by the detector (e.g. "BLE")
    pub detector_type: Option<String>,
}

impl From<IdentityRecord> for DetectedDevice {
    fn from(record: IdentityRecord) -> Self {
        Self { record, rssi: None, detector_type: None }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub active: Option<IdentityRecord>,
    pub last_applied_at: Option<DateTime<Local>>,
    /// Advisory end of the hold window for the active spoof
    pub hold_until: Option<DateTime<Local>>,
    pub display_text: String,
}

/// Everything the status endpoint and the dashboard show
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub status: StatusView,
    pub original: OriginalState,
    pub candidates: Vec<DetectedDevice>,
    pub gps: Option<LocationSnapshot>,
}
