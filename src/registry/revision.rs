//! Device hardware revisions and their availability rank.
use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

/// Hardware revision of the device.
///
/// Revisions are totally ordered by [`rank`](Self::rank); options carry
/// inclusive rank bounds that gate availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceRevision {
    /// EPass 0.2.
    V0_2,
    /// EPass 0.3 and 0.4 (identical pinout).
    V0_3_4,
    /// EPass 0.5.
    V0_5,
    /// EPass 0.6.
    V0_6,
    /// Revision string not recognised; nothing is available.
    Unknown,
}

impl DeviceRevision {
    /// All recognised revisions in rank order.
    pub const ALL: [Self; 4] = [Self::V0_2, Self::V0_3_4, Self::V0_5, Self::V0_6];

    /// Position of this revision in the total order, or `None` when the
    /// revision is unrecognised.
    #[must_use]
    pub const fn rank(self) -> Option<u8> {
        match self {
            Self::V0_2 => Some(0),
            Self::V0_3_4 => Some(1),
            Self::V0_5 => Some(2),
            Self::V0_6 => Some(3),
            Self::Unknown => None,
        }
    }

    /// Map a raw `device_rev=` value from the device-info block.
    ///
    /// Only the version prefix is inspected, so trailing bytes such as a
    /// newline or padding are ignored. Anything else maps to
    /// [`DeviceRevision::Unknown`].
    ///
    /// # Examples
    ///
    /// ```
    /// use epass_config::registry::DeviceRevision;
    ///
    /// assert_eq!(DeviceRevision::from_probe("0.5\n"), DeviceRevision::V0_5);
    /// assert_eq!(DeviceRevision::from_probe("0.4"), DeviceRevision::V0_3_4);
    /// assert_eq!(DeviceRevision::from_probe("1.0"), DeviceRevision::Unknown);
    /// ```
    #[must_use]
    pub fn from_probe(value: &str) -> Self {
        match value.get(..3) {
            Some("0.2") => Self::V0_2,
            Some("0.3" | "0.4") => Self::V0_3_4,
            Some("0.5") => Self::V0_5,
            Some("0.6") => Self::V0_6,
            _ => Self::Unknown,
        }
    }
}

impl FromStr for DeviceRevision {
    type Err = RegistryError;

    /// Parse a revision name as given on the command line or in a catalog
    /// (`0.2`, `0.3`, `0.4`, `0.3/0.4`, `0.5`, `0.6`, optionally prefixed
    /// with `epass`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        let version = lower
            .strip_prefix("epass")
            .map_or(lower.as_str(), str::trim_start);
        match version {
            "0.2" => Ok(Self::V0_2),
            "0.3" | "0.4" | "0.3/0.4" => Ok(Self::V0_3_4),
            "0.5" => Ok(Self::V0_5),
            "0.6" => Ok(Self::V0_6),
            _ => Err(RegistryError::UnknownRevision(trimmed.to_string())),
        }
    }
}

impl fmt::Display for DeviceRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V0_2 => write!(f, "EPass 0.2"),
            Self::V0_3_4 => write!(f, "EPass 0.3/0.4"),
            Self::V0_5 => write!(f, "EPass 0.5"),
            Self::V0_6 => write!(f, "EPass 0.6"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
