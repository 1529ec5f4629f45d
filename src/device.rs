//! Device-info probe: hardware revision and panel type from raw flash.
//!
//! The factory writes a small text block of `key=value` fields at a fixed
//! offset of the first flash partition.
use std::fmt;
use std::fs::File;
use std::io::{Read as _, Seek as _, SeekFrom};
use std::path::Path;

use crate::error::DeviceError;
use crate::registry::DeviceRevision;

/// Default block device holding the device-info block.
pub const DEFAULT_DEVCFG_PATH: &str = "/dev/mtdblock0";

/// Byte offset of the device-info block.
pub const DEVCFG_OFFSET: u64 = 0xFA000;

/// Size of the device-info block.
pub const DEVCFG_LEN: u64 = 1024;

/// Display panel fitted to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Generic 360x640 Hannstar panel (`hsd`).
    Hsd,
    /// Generic 360x640 BOE panel (`boe`).
    Boe,
    /// Laowu 360x640 Hannstar panel (`laowu`).
    Laowu,
    /// Unrecognised `screen=` value.
    Unknown,
}

impl Screen {
    fn from_probe(value: &str) -> Self {
        if value.starts_with("hsd") {
            Self::Hsd
        } else if value.starts_with("boe") {
            Self::Boe
        } else if value.starts_with("laowu") {
            Self::Laowu
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hsd => "Generic 360x640(Hannstar)",
            Self::Boe => "Generic 360x640(BOE)",
            Self::Laowu => "Laowu 360x640(Hannstar)",
            Self::Unknown => "Unknown",
        })
    }
}

/// Identity of the running device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Hardware revision.
    pub revision: DeviceRevision,
    /// Display panel.
    pub screen: Screen,
}

impl DeviceInfo {
    /// Read and parse the device-info block from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Io`] if the device cannot be read and
    /// [`DeviceError::MissingField`] if a required field is absent.
    pub fn probe(path: &Path) -> Result<Self, DeviceError> {
        let io_err = |source| DeviceError::Io {
            path: path.display().to_string(),
            source,
        };
        let mut file = File::open(path).map_err(io_err)?;
        file.seek(SeekFrom::Start(DEVCFG_OFFSET)).map_err(io_err)?;
        let mut block = Vec::new();
        file.take(DEVCFG_LEN)
            .read_to_end(&mut block)
            .map_err(io_err)?;

        let info = Self::parse(&block)?;
        tracing::debug!(
            path = %path.display(),
            revision = %info.revision,
            screen = %info.screen,
            "device probed"
        );
        Ok(info)
    }

    /// Parse a raw device-info block. Content after the first NUL is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::MissingField`] if `device_rev=` or `screen=`
    /// is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use epass_config::device::{DeviceInfo, Screen};
    /// use epass_config::registry::DeviceRevision;
    ///
    /// let info = DeviceInfo::parse(b"device_rev=0.5\nscreen=boe\n\0\0").unwrap();
    /// assert_eq!(info.revision, DeviceRevision::V0_5);
    /// assert_eq!(info.screen, Screen::Boe);
    /// ```
    pub fn parse(block: &[u8]) -> Result<Self, DeviceError> {
        let end = block.iter().position(|&b| b == 0).unwrap_or(block.len());
        let text = String::from_utf8_lossy(block.get(..end).unwrap_or(block));

        let revision = field(&text, "device_rev=")
            .map(DeviceRevision::from_probe)
            .ok_or(DeviceError::MissingField("device_rev"))?;
        let screen = field(&text, "screen=")
            .map(Screen::from_probe)
            .ok_or(DeviceError::MissingField("screen"))?;

        Ok(Self { revision, screen })
    }
}

/// Text following the first occurrence of `key`.
fn field<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.find(key)
        .and_then(|pos| text.get(pos + key.len()..))
}
