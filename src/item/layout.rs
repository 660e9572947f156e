//! Row layout and theme

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::library::ImageSizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Minimal,
    #[default]
    Compact,
    Medium,
    Large,
}

impl Layout {
    /// Edge length of the artwork square, in pixels
    pub fn image_size(&self) -> u32 {
        match self {
            Layout::Minimal => 0,
            Layout::Compact => 32,
            Layout::Medium => 56,
            Layout::Large => 128,
        }
    }

    /// Artwork resolution to request; minimal rows show no artwork
    pub fn image_sizing(&self) -> Option<ImageSizing> {
        match self {
            Layout::Minimal => None,
            Layout::Compact => Some(ImageSizing::Small),
            Layout::Medium | Layout::Large => Some(ImageSizing::Large),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Minimal => "minimal",
            Layout::Compact => "compact",
            Layout::Medium => "medium",
            Layout::Large => "large",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" => Ok(Layout::Minimal),
            "compact" => Ok(Layout::Compact),
            "medium" => Ok(Layout::Medium),
            "large" => Ok(Layout::Large),
            other => Err(format!(
                "unknown layout '{}', expected minimal, compact, medium or large",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}
