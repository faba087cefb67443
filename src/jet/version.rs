//! Jet format version detection.
//!
//! The file header on page 0 carries a one-byte format code at offset 0x14
//! which maps to a [`JetVersion`]. The version governs the page size (2 KiB
//! for Jet 3, 4 KiB for everything later), the record prefix width, the
//! layout of the trailing variable-length metadata, and the default text
//! encoding.

use serde::Serialize;
use std::fmt;

use crate::jet::constants::*;
use crate::MdbError;

/// Jet dialect of a database file.
///
/// | Code | Version | Product era |
/// |------|---------|-------------|
/// | 0 | [`JetVersion::V3`] | Access 97 |
/// | 1 | [`JetVersion::V4`] | Access 2000-2003 |
/// | 2 | [`JetVersion::V5`] | Access 2007 (`.accdb`) |
/// | 3 | [`JetVersion::V2010`] | Access 2010+ (`.accdb`) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JetVersion {
    /// Jet 3 (Access 97).
    V3,
    /// Jet 4 (Access 2000-2003).
    V4,
    /// ACE 12 (Access 2007).
    V5,
    /// ACE 14 (Access 2010 and later).
    V2010,
}

impl JetVersion {
    /// Map the header version code to a version.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(JetVersion::V3),
            1 => Some(JetVersion::V4),
            2 => Some(JetVersion::V5),
            3 => Some(JetVersion::V2010),
            _ => None,
        }
    }

    /// Page size in bytes for this dialect.
    pub fn page_size(&self) -> usize {
        match self {
            JetVersion::V3 => SIZE_PAGE_JET3,
            _ => SIZE_PAGE_JET4,
        }
    }

    /// Bytes of header at the start of every record.
    pub fn record_prefix(&self) -> usize {
        match self {
            JetVersion::V3 => 1,
            _ => 2,
        }
    }

    /// Bytes per entry in the trailing variable-length offset table.
    pub fn var_entry_size(&self) -> usize {
        match self {
            JetVersion::V3 => VAR_ENTRY_J3,
            _ => VAR_ENTRY_J4,
        }
    }

    /// The numeric version as reported to callers (3, 4, 5, or 2010).
    pub fn number(&self) -> u16 {
        match self {
            JetVersion::V3 => 3,
            JetVersion::V4 => 4,
            JetVersion::V5 => 5,
            JetVersion::V2010 => 2010,
        }
    }
}

impl fmt::Display for JetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Verify the file magic and read the version from the first page.
///
/// # Examples
///
/// ```
/// use mdb::jet::version::{detect_version, JetVersion};
///
/// let mut header = vec![0u8; 0x800];
/// header[..4].copy_from_slice(&[0x00, 0x01, 0x00, 0x00]);
/// header[0x14] = 1;
/// assert_eq!(detect_version(&header).unwrap(), JetVersion::V4);
/// ```
pub fn detect_version(buf: &[u8]) -> Result<JetVersion, MdbError> {
    if buf.len() < HDR_MIN_LEN {
        return Err(MdbError::MalformedBuffer(format!(
            "{} bytes is too short for a database header",
            buf.len()
        )));
    }
    if buf[..4] != FILE_MAGIC {
        return Err(MdbError::MalformedBuffer(
            "file magic does not match the Access signature".to_string(),
        ));
    }
    let code = buf[HDR_VERSION_CODE];
    JetVersion::from_code(code).ok_or(MdbError::UnknownVersion(code))
}
