//! Seek-based reader for PIO dumps.
//!
//! [`PioFile::open`] decodes the header and the whole directory once; array
//! data is only touched when a caller asks for it. Every read call issues
//! fresh positional I/O into a newly allocated buffer: there is no cache.
//!
//! # Missing data policy
//! - A (name, sub-index) pair that is not in the directory reads as an empty
//!   vector. Callers use this to probe alternate field names.
//! - A read that runs past the end of the file returns the words that were
//!   available and logs a warning.

use crate::io::header::{
    ENTRY_TAIL_WORDS, PIO_TAG, PioHeader, RawEntryTail, RawHeader, WORD_BYTES, to_count,
    trim_name,
};
use crate::mesh_error::PioError;
use hashbrown::HashMap;
use num_traits::NumCast;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// One directory record locating an array in the data region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Base name with fill characters stripped.
    pub name: String,
    /// 0 for scalar fields, `1..` for the components of a multi-component field.
    pub index: u32,
    /// Number of doubles in the array.
    pub length: u64,
    /// Word offset of the first element.
    pub offset: u64,
}

impl DirectoryEntry {
    /// The `"<name>_<index>"` key fields are referenced by.
    pub fn key(&self) -> String {
        field_key(&self.name, self.index)
    }

    /// One past the last word of this array.
    pub fn end_word(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

/// Build the `"<name>_<index>"` key of a field.
pub fn field_key(name: &str, index: u32) -> String {
    format!("{name}_{index}")
}

/// Shape of all arrays sharing a base name.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ArrayDims {
    /// Element count (taken from the last sub-index seen).
    pub length: u64,
    /// Number of sub-indices observed.
    pub width: u64,
}

/// An open dump: header, directory, and exclusive ownership of the source.
///
/// The source is closed when the value is dropped.
#[derive(Debug)]
pub struct PioFile<R = BufReader<File>> {
    source: R,
    path: Option<PathBuf>,
    header: PioHeader,
    entries: Vec<DirectoryEntry>,
    lookup: HashMap<String, usize>,
    dims: BTreeMap<String, ArrayDims>,
    byte_len: u64,
}

impl PioFile<BufReader<File>> {
    /// Open a dump on disk.
    ///
    /// # Errors
    /// [`PioError::InvalidTag`] or [`PioError::InvalidMarker`] when the file
    /// is not a PIO dump; I/O and directory errors otherwise.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PioError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut pio = Self::from_reader(BufReader::new(file))?;
        pio.path = Some(path.to_path_buf());
        Ok(pio)
    }
}

impl<R: Read + Seek> PioFile<R> {
    /// Decode a dump from any seekable byte source.
    pub fn from_reader(mut source: R) -> Result<Self, PioError> {
        let byte_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let mut raw: RawHeader = bytemuck::Zeroable::zeroed();
        let got = read_full(&mut source, bytemuck::bytes_of_mut(&mut raw))?;
        if got < std::mem::size_of::<RawHeader>() {
            // A truncated file can still carry a wrong tag; report that first.
            if &raw.tag != PIO_TAG {
                return Err(PioError::InvalidTag {
                    found: String::from_utf8_lossy(&raw.tag[..got.min(8)]).into_owned(),
                });
            }
            return Err(PioError::CorruptHeader(format!(
                "file holds {got} bytes, header needs {}",
                std::mem::size_of::<RawHeader>()
            )));
        }
        let header = PioHeader::from_raw(&raw)?;
        log::debug!("PIO header\n{header}");
        if header.n_arrays > 0 && header.name_width as u64 > byte_len {
            return Err(PioError::CorruptHeader(format!(
                "name width {} exceeds the {byte_len}-byte file",
                header.name_width
            )));
        }

        let mut pio = PioFile {
            source,
            path: None,
            header,
            entries: Vec::new(),
            lookup: HashMap::new(),
            dims: BTreeMap::new(),
            byte_len,
        };
        pio.load_directory()?;
        Ok(pio)
    }

    fn load_directory(&mut self) -> Result<(), PioError> {
        let name_width = self.header.name_width;
        let slot_bytes = self.header.entry_words.saturating_mul(WORD_BYTES).max(1);
        let mut slot = vec![0u8; name_width + ENTRY_TAIL_WORDS * WORD_BYTES as usize];
        self.entries
            .reserve(self.header.n_arrays.min((self.byte_len / slot_bytes) as usize));

        for i in 0..self.header.n_arrays {
            let pos = self.header.entry_position(i);
            self.source.seek(SeekFrom::Start(pos))?;
            let got = read_full(&mut self.source, &mut slot)?;
            // The reserved word is optional on disk; the first three are not.
            if got < name_width + (ENTRY_TAIL_WORDS - 1) * WORD_BYTES as usize {
                return Err(PioError::CorruptDirectory {
                    entry: i,
                    reason: format!("truncated at byte {pos}"),
                });
            }
            let mut tail = RawEntryTail::default();
            bytemuck::bytes_of_mut(&mut tail)[..got - name_width]
                .copy_from_slice(&slot[name_width..got]);

            let corrupt = |reason: String| PioError::CorruptDirectory { entry: i, reason };
            let entry = DirectoryEntry {
                name: trim_name(&slot[..name_width]),
                index: to_count(tail.index, "sub-index")
                    .map_err(|e| corrupt(e.to_string()))
                    .and_then(|i| {
                        u32::try_from(i).map_err(|_| corrupt(format!("sub-index {i} too large")))
                    })?,
                length: to_count(tail.length, "length").map_err(|e| corrupt(e.to_string()))?,
                offset: to_count(tail.offset, "offset").map_err(|e| corrupt(e.to_string()))?,
            };
            if entry.name.is_empty() {
                return Err(corrupt("empty array name".into()));
            }
            if entry.end_word().saturating_mul(WORD_BYTES) > self.byte_len {
                log::warn!(
                    "array {} extends past end of file ({} > {} bytes)",
                    entry.key(),
                    entry.end_word().saturating_mul(WORD_BYTES),
                    self.byte_len
                );
            }

            let key = entry.key();
            if self.lookup.insert(key.clone(), self.entries.len()).is_some() {
                return Err(corrupt(format!("duplicate array {key}")));
            }
            let dims = self.dims.entry(entry.name.clone()).or_default();
            dims.length = entry.length;
            dims.width += 1;
            self.entries.push(entry);
        }
        Ok(())
    }

    /// Read a whole array; empty if the field is absent.
    pub fn read_array(&mut self, name: &str, index: u32) -> Result<Vec<f64>, PioError> {
        self.read_array_range(name, index, 0, None)
    }

    /// Read `count` elements (all remaining when `None`) starting at element
    /// `start` of an array.
    ///
    /// Requests reaching past the array are clamped to it, and reads reaching
    /// past the end of the file are truncated; both are logged as warnings.
    pub fn read_array_range(
        &mut self,
        name: &str,
        index: u32,
        start: u64,
        count: Option<u64>,
    ) -> Result<Vec<f64>, PioError> {
        let Some(entry) = self.entry(name, index).cloned() else {
            return Ok(Vec::new());
        };
        let available = entry.length.saturating_sub(start);
        let wanted = count.unwrap_or(available);
        if wanted > available {
            log::warn!(
                "{}: range {}..{} clamped to array length {}",
                entry.key(),
                start,
                start.saturating_add(wanted),
                entry.length
            );
        }
        let n = wanted.min(available);
        if n == 0 {
            return Ok(Vec::new());
        }

        // Never allocate beyond what the file can hold.
        let first = entry.offset.saturating_add(start);
        let in_file = (self.byte_len / WORD_BYTES).saturating_sub(first);
        let mut data = vec![0f64; n.min(in_file) as usize];
        let mut words = 0;
        if !data.is_empty() {
            self.seek_word(first)?;
            let got = read_full(&mut self.source, bytemuck::cast_slice_mut(&mut data))?;
            words = got / WORD_BYTES as usize;
        }
        if (words as u64) < n {
            log::warn!(
                "{}: short read, got {} of {} words at word offset {}",
                entry.key(),
                words,
                n,
                first
            );
            data.truncate(words);
        }
        Ok(data)
    }

    /// Read an array and cast every element by value (e.g. truncation to an
    /// integer type).
    pub fn read_typed<T: NumCast>(&mut self, name: &str, index: u32) -> Result<Vec<T>, PioError> {
        self.read_typed_range(name, index, 0, None)
    }

    /// Ranged variant of [`read_typed`](Self::read_typed).
    pub fn read_typed_range<T: NumCast>(
        &mut self,
        name: &str,
        index: u32,
        start: u64,
        count: Option<u64>,
    ) -> Result<Vec<T>, PioError> {
        let raw = self.read_array_range(name, index, start, count)?;
        cast_values(&raw, &field_key(name, index))
    }

    /// Read every component `1..=width` of a multi-component field.
    pub fn read_field_2d(&mut self, name: &str) -> Result<Vec<Vec<f64>>, PioError> {
        let width = self.array_dims(name).map_or(0, |d| d.width) as u32;
        (1..=width).map(|i| self.read_array(name, i)).collect()
    }

    /// Interpret the raw bytes of an array as a NUL-terminated string.
    pub fn read_string(&mut self, name: &str, index: u32) -> Result<String, PioError> {
        let data = self.read_array(name, index)?;
        let bytes: &[u8] = bytemuck::cast_slice(&data);
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    fn seek_word(&mut self, word: u64) -> Result<(), PioError> {
        self.source
            .seek(SeekFrom::Start(word.saturating_mul(WORD_BYTES)))?;
        Ok(())
    }
}

impl<R> PioFile<R> {
    pub fn header(&self) -> &PioHeader {
        &self.header
    }

    /// Path the dump was opened from, if it came from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Directory entries in file order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str, index: u32) -> Option<&DirectoryEntry> {
        self.lookup
            .get(&field_key(name, index))
            .map(|&i| &self.entries[i])
    }

    pub fn exists(&self, name: &str, index: u32) -> bool {
        self.lookup.contains_key(&field_key(name, index))
    }

    /// Field keys (`"<name>_<index>"`) in file order.
    pub fn field_names(&self) -> Vec<String> {
        self.entries.iter().map(DirectoryEntry::key).collect()
    }

    pub fn array_dims(&self, name: &str) -> Option<ArrayDims> {
        self.dims.get(name).copied()
    }

    /// All base names with their dimensions, sorted by name.
    pub fn all_dims(&self) -> &BTreeMap<String, ArrayDims> {
        &self.dims
    }

    /// Element count of a field, 0 if absent.
    pub fn field_length(&self, name: &str) -> u64 {
        self.array_dims(name).map_or(0, |d| d.length)
    }

    /// Number of sub-indices of a field, 0 if absent.
    pub fn field_width(&self, name: &str) -> u64 {
        self.array_dims(name).map_or(0, |d| d.width)
    }

    /// Size of the underlying source in bytes.
    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    /// Write every field key, one per line.
    pub fn list_fields<W: Write>(&self, mut out: W) -> io::Result<()> {
        for e in &self.entries {
            writeln!(out, "{}", e.key())?;
        }
        Ok(())
    }

    /// Release the source.
    pub fn into_inner(self) -> R {
        self.source
    }
}

/// Element-wise value cast of a raw double array.
pub(crate) fn cast_values<T: NumCast>(raw: &[f64], field: &str) -> Result<Vec<T>, PioError> {
    raw.iter()
        .map(|&v| {
            T::from(v).ok_or_else(|| PioError::Unrepresentable {
                field: field.to_string(),
                value: v.to_string(),
                target: std::any::type_name::<T>(),
            })
        })
        .collect()
}

/// Read until `buf` is full or the source is exhausted; returns bytes read.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
