use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A layer of a world. The primary dimension is reached by name; secondary
/// dimensions are derived from a primary level and share its storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Dimension {
    #[default]
    Overworld = 0,
    Nether = 1,
    TheEnd = 2,
}

impl Dimension {
    /// Canonical string key used in configs, logs and derived level names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overworld => "overworld",
            Self::Nether => "nether",
            Self::TheEnd => "the_end",
        }
    }

    pub const fn is_primary(self) -> bool {
        matches!(self, Self::Overworld)
    }

    /// Whether sunlight reaches this dimension at all.
    pub const fn has_sky(self) -> bool {
        !matches!(self, Self::Nether)
    }

    /// Sub-directory holding this dimension's regions under a world's base path.
    /// The primary dimension lives directly in the base path.
    pub const fn storage_dir(self) -> Option<&'static str> {
        match self {
            Self::Overworld => None,
            Self::Nether => Some("DIM-1"),
            Self::TheEnd => Some("DIM1"),
        }
    }
}

impl FromStr for Dimension {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overworld" => Ok(Self::Overworld),
            "nether" => Ok(Self::Nether),
            "the_end" | "end" => Ok(Self::TheEnd),
            _ => Err(ParseError::Dimension(s.to_string())),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
