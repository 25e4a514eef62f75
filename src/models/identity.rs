//! Identity model
//!
//! Identity records (what can be impersonated), the original identity captured
//! at startup, and the committed spoof status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Longest SSID hostapd accepts, in bytes
pub const MAX_SSID_BYTES: usize = 32;

/// Which advertised identity a record targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    /// Wi-Fi access point name (SSID)
    Network,
    /// Short-range radio (Bluetooth) device name
    Radio,
}

impl IdentityKind {
    pub const ALL: [IdentityKind; 2] = [IdentityKind::Network, IdentityKind::Radio];

    /// Wire label used in the transition log and the control endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKind::Network => "wifi",
            IdentityKind::Radio => "radio",
        }
    }

    /// Label with the first letter upper-cased, for the display
    pub fn title(&self) -> &'static str {
        match self {
            IdentityKind::Network => "Wifi",
            IdentityKind::Radio => "Radio",
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown identity type '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for IdentityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wifi" | "network" | "pwnagotchi" => Ok(IdentityKind::Network),
            "radio" | "bluetooth" | "bt" | "ble" | "flipper" => Ok(IdentityKind::Radio),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

impl Serialize for IdentityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IdentityKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

/// An identity that can be impersonated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(rename = "type")]
    pub kind: IdentityKind,
    pub name: String,
}

impl IdentityRecord {
    pub fn new(kind: IdentityKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }

    pub fn network(name: impl Into<String>) -> Self {
        Self::new(IdentityKind::Network, name)
    }

    pub fn radio(name: impl Into<String>) -> Self {
        Self::new(IdentityKind::Radio, name)
    }
}

impl fmt::Display for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind.title())
    }
}

/// Device identity as found at startup.
///
/// `None` means the field could not be read and must not be restored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OriginalState {
    pub network_name: Option<String>,
    pub radio_name: Option<String>,
    pub hardware_address: Option<String>,
}

impl OriginalState {
    pub fn is_complete(&self) -> bool {
        self.network_name.is_some() && self.radio_name.is_some() && self.hardware_address.is_some()
    }

    /// Original name for the given kind, if it was captured
    pub fn name_for(&self, kind: IdentityKind) -> Option<&str> {
        match kind {
            IdentityKind::Network => self.network_name.as_deref(),
            IdentityKind::Radio => self.radio_name.as_deref(),
        }
    }
}

/// Committed spoof state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpoofStatus {
    /// `None` while the device presents its original identity
    pub active: Option<IdentityRecord>,
    pub last_applied_at: Option<DateTime<Local>>,
}

impl SpoofStatus {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}
