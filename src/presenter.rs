//! Display status
//!
//! Short text for a small screen, plus where and how to draw it.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::SpoofStatus;

/// Name characters shown before truncation
const MAX_NAME_CHARS: usize = 20;

pub const IDLE_TEXT: &str = "Spoof: None";

/// Render the committed status
pub fn render(status: &SpoofStatus) -> String {
    match &status.active {
        None => IDLE_TEXT.to_string(),
        Some(record) => {
            let name: String = record.name.chars().take(MAX_NAME_CHARS).collect();
            format!("Spoof: {}\n{}", name, record.kind.title())
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    #[default]
    Small,
    Medium,
    Bold,
}

impl FromStr for FontSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(FontSize::Small),
            "medium" => Ok(FontSize::Medium),
            "bold" => Ok(FontSize::Bold),
            other => Err(format!("unknown font size '{}'", other)),
        }
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FontSize::Small => "small",
            FontSize::Medium => "medium",
            FontSize::Bold => "bold",
        };
        f.write_str(label)
    }
}

/// Screen element for the spoof status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusWidget {
    pub position: (i32, i32),
    pub font: FontSize,
}
