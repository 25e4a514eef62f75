//! Transition log entry

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::{IdentityRecord, LocationSnapshot};

/// Timestamp layout used in the transition log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One line of the transition log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub spoof: Option<IdentityRecord>,
    pub gps: Option<LocationSnapshot>,
}

impl LogEntry {
    pub fn new(at: DateTime<Local>, spoof: Option<IdentityRecord>, gps: Option<LocationSnapshot>) -> Self {
        Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            spoof,
            gps,
        }
    }
}
