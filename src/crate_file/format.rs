//! Crate format constants and structures.

use std::fmt;

/// Magic bytes at the start of a Crate file.
pub const CRATE_MAGIC: &[u8; 8] = b"PXR-USDC";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Offset of the 3-byte version in the header.
pub const VERSION_OFFSET: usize = 8;

/// Offset of the table-of-contents position in the header.
pub const TOC_OFFSET_POS: usize = 16;

/// Fixed width of a section name in a TOC record.
pub const SECTION_NAME_SIZE: usize = 16;

/// Size of a whole TOC record: name, start, end.
pub const SECTION_RECORD_SIZE: usize = SECTION_NAME_SIZE + 8 + 8;

/// Oldest version whose structural sections are compressed.
pub const MIN_SUPPORTED_VERSION: Version = Version::new(0, 4, 0);

/// Terminator between field-index lists in the FIELDSETS section.
pub const FIELD_SET_TERMINATOR: u32 = u32::MAX;

pub const TOKENS_SECTION: &str = "TOKENS";
pub const STRINGS_SECTION: &str = "STRINGS";
pub const FIELDS_SECTION: &str = "FIELDS";
pub const FIELDSETS_SECTION: &str = "FIELDSETS";
pub const PATHS_SECTION: &str = "PATHS";
pub const SPECS_SECTION: &str = "SPECS";

/// Known sections in the order they have to be decoded.
///
/// Path element names and spec fields resolve through the token table,
/// so TOKENS always comes first.
pub const SECTION_DECODE_ORDER: [&str; 6] = [
    TOKENS_SECTION,
    STRINGS_SECTION,
    FIELDS_SECTION,
    FIELDSETS_SECTION,
    PATHS_SECTION,
    SPECS_SECTION,
];

/// Crate file version `major.minor.patch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self { major, minor, patch }
    }

    /// Whether this reader understands files of this version.
    pub fn is_supported(&self) -> bool {
        *self >= MIN_SUPPORTED_VERSION
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// One entry of the table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocSection {
    /// Section name, trailing NULs trimmed.
    pub name: String,
    /// Absolute start offset in the file.
    pub start: u64,
    /// Third TOC field, recorded as read. Decoding only relies on `start`.
    pub end: u64,
}

impl TocSection {
    pub fn new(name: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// Whether a decoder exists for this section name.
    pub fn is_known(&self) -> bool {
        SECTION_DECODE_ORDER.contains(&self.name.as_str())
    }
}

/// Decode a fixed-width, NUL-padded section name.
pub fn section_name(raw: &[u8; SECTION_NAME_SIZE]) -> std::result::Result<&str, std::str::Utf8Error> {
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    std::str::from_utf8(&raw[..len])
}
