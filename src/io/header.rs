//! Fixed binary records of a PIO dump: the file header and the numeric tail
//! of a directory entry.
//!
//! All numeric fields are stored as native-endian `f64`, including those
//! that are semantically integers (lengths, counts, word offsets). One
//! *word* is eight bytes; every offset in the file is expressed in words.

use crate::mesh_error::PioError;
use bytemuck::{Pod, Zeroable};
use num_traits::ToPrimitive;
use std::fmt;

/// Bytes per addressing word.
pub const WORD_BYTES: u64 = 8;

/// Literal tag opening every dump.
pub const PIO_TAG: &[u8; 8] = b"pio_file";

/// The only format marker this crate understands.
pub const FORMAT_MARKER: f64 = 2.0;

/// Number of doubles following the name in a directory entry:
/// sub-index, element count, word offset, reserved.
pub const ENTRY_TAIL_WORDS: usize = 4;

/// On-disk header layout (88 bytes, 11 words).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct RawHeader {
    pub tag: [u8; 8],
    pub marker: f64,
    pub version: f64,
    pub name_width: f64,
    pub header_words: f64,
    pub entry_words: f64,
    pub date: [u8; 16],
    pub n_arrays: f64,
    pub directory_offset: f64,
    pub signature: f64,
}

static_assertions::assert_eq_size!(RawHeader, [u8; 88]);
static_assertions::assert_eq_size!(RawEntryTail, [f64; ENTRY_TAIL_WORDS]);
static_assertions::assert_eq_align!(RawHeader, f64);

/// Header size in words; the header region may be padded beyond this.
pub const RAW_HEADER_WORDS: u64 = (std::mem::size_of::<RawHeader>() as u64) / WORD_BYTES;

/// On-disk numeric tail of a directory entry.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct RawEntryTail {
    pub index: f64,
    pub length: f64,
    pub offset: f64,
    pub reserved: f64,
}

/// Decoded, validated dump header.
#[derive(Clone, Debug, PartialEq)]
pub struct PioHeader {
    pub version: f64,
    /// Width in bytes of the name field of each directory entry.
    pub name_width: usize,
    /// Length of the header region, in words.
    pub header_words: u64,
    /// Distance between consecutive directory entries, in words.
    pub entry_words: u64,
    pub date: [u8; 16],
    pub n_arrays: usize,
    /// Word offset of the directory table.
    pub directory_offset: u64,
    pub signature: f64,
}

impl PioHeader {
    /// Validate and decode a raw header.
    ///
    /// # Errors
    /// `InvalidTag` / `InvalidMarker` when the file is not a PIO dump at all,
    /// `CorruptHeader` when the lengths cannot describe a readable file.
    pub fn from_raw(raw: &RawHeader) -> Result<Self, PioError> {
        if &raw.tag != PIO_TAG {
            return Err(PioError::InvalidTag {
                found: String::from_utf8_lossy(&raw.tag).into_owned(),
            });
        }
        if raw.marker != FORMAT_MARKER {
            return Err(PioError::InvalidMarker {
                found: raw.marker.to_string(),
            });
        }
        let header = PioHeader {
            version: raw.version,
            name_width: to_count(raw.name_width, "name width")? as usize,
            header_words: to_count(raw.header_words, "header length")?,
            entry_words: to_count(raw.entry_words, "directory entry length")?,
            date: raw.date,
            n_arrays: to_count(raw.n_arrays, "array count")? as usize,
            directory_offset: to_count(raw.directory_offset, "directory offset")?,
            signature: raw.signature,
        };
        header.check_lengths()?;
        Ok(header)
    }

    /// Encode into the on-disk record.
    pub fn to_raw(&self) -> RawHeader {
        RawHeader {
            tag: *PIO_TAG,
            marker: FORMAT_MARKER,
            version: self.version,
            name_width: self.name_width as f64,
            header_words: self.header_words as f64,
            entry_words: self.entry_words as f64,
            date: self.date,
            n_arrays: self.n_arrays as f64,
            directory_offset: self.directory_offset as f64,
            signature: self.signature,
        }
    }

    /// The header region must hold the fixed record, and each directory
    /// slot must hold a name plus the numeric tail.
    pub(crate) fn check_lengths(&self) -> Result<(), PioError> {
        if self.name_width == 0 {
            return Err(PioError::CorruptHeader("name width is zero".into()));
        }
        if self.header_words < RAW_HEADER_WORDS {
            return Err(PioError::CorruptHeader(format!(
                "header length {} words is shorter than the {} word record",
                self.header_words, RAW_HEADER_WORDS
            )));
        }
        let needed = self.name_width as u64 + (ENTRY_TAIL_WORDS as u64 - 1) * WORD_BYTES;
        if self.entry_words * WORD_BYTES < needed {
            return Err(PioError::CorruptHeader(format!(
                "directory entry length {} words cannot hold a {}-byte name",
                self.entry_words, self.name_width
            )));
        }
        Ok(())
    }

    /// Date string with trailing blanks and NULs removed.
    pub fn date_str(&self) -> String {
        trim_name(&self.date)
    }

    /// Byte position of directory entry `i`.
    pub fn entry_position(&self, i: usize) -> u64 {
        (i as u64)
            .saturating_mul(self.entry_words)
            .saturating_add(self.directory_offset)
            .saturating_mul(WORD_BYTES)
    }
}

impl fmt::Display for PioHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "       version: {}", self.version)?;
        writeln!(f, "   Name Length: {}", self.name_width)?;
        writeln!(f, " Header Length: {}", self.header_words)?;
        writeln!(f, "  Index Length: {}", self.entry_words)?;
        writeln!(f, "          Date: {}", self.date_str())?;
        writeln!(f, "      N Arrays: {}", self.n_arrays)?;
        writeln!(f, "  Index Offset: {}", self.directory_offset)?;
        write!(f, "File Signature: {}", self.signature)
    }
}

/// Convert a stored double to a non-negative integer count.
pub(crate) fn to_count(v: f64, what: &str) -> Result<u64, PioError> {
    v.to_u64()
        .ok_or_else(|| PioError::CorruptHeader(format!("{what} is not a non-negative integer: {v}")))
}

/// Strip the fill characters a writer pads name fields with.
pub(crate) fn trim_name(raw: &[u8]) -> String {
    let end = raw
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |p| p + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
