//! Output parameters shared by every generation mode.

use super::ParseParameterError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    /// Landscape 16:9.
    #[serde(rename = "16:9")]
    Landscape,
    /// Portrait 9:16.
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Every supported ratio.
    pub const ALL: [Self; 2] = [Self::Landscape, Self::Portrait];

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

impl TryFrom<&str> for AspectRatio {
    type Error = ParseParameterError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            _ => Err(ParseParameterError::new("aspect_ratio", value)),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// 1280x720.
    #[serde(rename = "720p")]
    Hd720,
    /// 1920x1080.
    #[serde(rename = "1080p")]
    FullHd1080,
}

impl Resolution {
    /// Every supported resolution.
    pub const ALL: [Self; 2] = [Self::Hd720, Self::FullHd1080];

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hd720 => "720p",
            Self::FullHd1080 => "1080p",
        }
    }
}

impl TryFrom<&str> for Resolution {
    type Error = ParseParameterError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "720p" => Ok(Self::Hd720),
            "1080p" => Ok(Self::FullHd1080),
            _ => Err(ParseParameterError::new("resolution", value)),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy controlling whether people may appear in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonGeneration {
    /// People of any age.
    AllowAll,
    /// Adults only.
    AllowAdult,
    /// No people.
    DontAllow,
}

impl PersonGeneration {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllowAll => "allow_all",
            Self::AllowAdult => "allow_adult",
            Self::DontAllow => "dont_allow",
        }
    }
}

impl TryFrom<&str> for PersonGeneration {
    type Error = ParseParameterError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow_all" => Ok(Self::AllowAll),
            "allow_adult" => Ok(Self::AllowAdult),
            "dont_allow" => Ok(Self::DontAllow),
            _ => Err(ParseParameterError::new("person_generation", value)),
        }
    }
}

impl fmt::Display for PersonGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
