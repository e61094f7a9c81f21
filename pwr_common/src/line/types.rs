//! Line identifier and level types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a physical output line (GPIO line offset on its chip).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u32);

impl LineId {
    /// Raw line offset.
    #[inline]
    pub const fn offset(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.0)
    }
}

impl From<u32> for LineId {
    fn from(offset: u32) -> Self {
        Self(offset)
    }
}

/// Logical level of an output line. `High` means "button pressed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Released.
    #[default]
    Low,
    /// Pressed.
    High,
}

impl Level {
    /// Value as written to a GPIO line handle.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }

    /// Level from a raw GPIO value (any non-zero value is high).
    #[inline]
    pub const fn from_u8(raw: u8) -> Self {
        if raw == 0 { Self::Low } else { Self::High }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::High => write!(f, "HIGH"),
        }
    }
}
