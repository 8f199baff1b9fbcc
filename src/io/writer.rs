//! PIO dump writer.
//!
//! Arrays are streamed into the data region in call order; the directory is
//! emitted as a second pass by [`PioWriter::finish`], each entry carrying the
//! word offset recorded while its data was written. The header is written
//! as a zeroed placeholder first and rewritten once the array count and the
//! directory position are known, so the sink must be seekable.

use crate::io::header::{ENTRY_TAIL_WORDS, PioHeader, RawEntryTail, WORD_BYTES};
use crate::io::reader::{PioFile, field_key};
use crate::mesh_error::PioError;
use hashbrown::HashSet;
use std::io::{Read, Seek, SeekFrom, Write};

/// Fill character for name fields.
pub const NAME_FILL: u8 = b' ';

/// Header values a writer copies verbatim; counts and offsets are derived.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderTemplate {
    pub version: f64,
    pub name_width: usize,
    pub header_words: u64,
    pub entry_words: u64,
    pub date: [u8; 16],
    pub signature: f64,
}

impl Default for HeaderTemplate {
    fn default() -> Self {
        Self {
            version: 1.0,
            name_width: 32,
            header_words: 11,
            entry_words: 8,
            date: *b"                ",
            signature: 0.0,
        }
    }
}

impl From<&PioHeader> for HeaderTemplate {
    fn from(h: &PioHeader) -> Self {
        Self {
            version: h.version,
            name_width: h.name_width,
            header_words: h.header_words,
            entry_words: h.entry_words,
            date: h.date,
            signature: h.signature,
        }
    }
}

impl HeaderTemplate {
    /// Template with the given name width and a directory slot just large
    /// enough for it.
    pub fn with_name_width(name_width: usize) -> Self {
        let tail = ENTRY_TAIL_WORDS as u64 * WORD_BYTES;
        Self {
            name_width,
            entry_words: (name_width as u64 + tail).div_ceil(WORD_BYTES),
            ..Self::default()
        }
    }

    fn header(&self, n_arrays: usize, directory_offset: u64) -> PioHeader {
        PioHeader {
            version: self.version,
            name_width: self.name_width,
            header_words: self.header_words,
            entry_words: self.entry_words,
            date: self.date,
            n_arrays,
            directory_offset,
            signature: self.signature,
        }
    }
}

#[derive(Debug)]
struct PendingEntry {
    name: String,
    index: u32,
    length: u64,
    offset: u64,
}

/// Streaming writer for one dump.
#[derive(Debug)]
pub struct PioWriter<W: Write + Seek> {
    sink: W,
    template: HeaderTemplate,
    /// Next free word in the data region.
    position: u64,
    pending: Vec<PendingEntry>,
    keys: HashSet<String>,
}

impl<W: Write + Seek> PioWriter<W> {
    /// Start a dump; writes the placeholder header region.
    pub fn new(mut sink: W, template: HeaderTemplate) -> Result<Self, PioError> {
        template.header(0, template.header_words).check_lengths()?;
        sink.seek(SeekFrom::Start(0))?;
        write_zero_words(&mut sink, template.header_words)?;
        Ok(Self {
            sink,
            position: template.header_words,
            template,
            pending: Vec::new(),
            keys: HashSet::new(),
        })
    }

    /// Append one array to the data region.
    ///
    /// # Errors
    /// [`PioError::InvalidName`] if the name does not fit the name field or
    /// the (name, index) pair was already written.
    pub fn write_array(&mut self, name: &str, index: u32, data: &[f64]) -> Result<(), PioError> {
        self.check_name(name, index)?;
        self.sink.write_all(bytemuck::cast_slice(data))?;
        self.pending.push(PendingEntry {
            name: name.to_string(),
            index,
            length: data.len() as u64,
            offset: self.position,
        });
        self.position += data.len() as u64;
        Ok(())
    }

    /// Append the components of a multi-component field with consecutive
    /// sub-indices starting at `first_index`.
    pub fn write_components<D: AsRef<[f64]>>(
        &mut self,
        name: &str,
        first_index: u32,
        components: &[D],
    ) -> Result<(), PioError> {
        for (i, c) in components.iter().enumerate() {
            self.write_array(name, first_index + i as u32, c.as_ref())?;
        }
        Ok(())
    }

    fn check_name(&mut self, name: &str, index: u32) -> Result<(), PioError> {
        let invalid = |reason: String| PioError::InvalidName {
            name: name.to_string(),
            reason,
        };
        if name.is_empty() || name.trim_end() != name || name.contains('\0') {
            return Err(invalid("names must be non-empty without trailing fill".into()));
        }
        if name.len() > self.template.name_width {
            return Err(invalid(format!(
                "longer than the {}-byte name field",
                self.template.name_width
            )));
        }
        if !self.keys.insert(field_key(name, index)) {
            return Err(invalid(format!("sub-index {index} already written")));
        }
        Ok(())
    }

    /// Words written to the data region so far, header included.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Write the directory, rewrite the header, and hand back the sink.
    pub fn finish(mut self) -> Result<W, PioError> {
        let directory_offset = self.position;
        let slot_bytes = (self.template.entry_words * WORD_BYTES) as usize;
        let mut slot = vec![0u8; slot_bytes];
        for e in &self.pending {
            slot.fill(0);
            let (name_field, rest) = slot.split_at_mut(self.template.name_width);
            name_field.fill(NAME_FILL);
            name_field[..e.name.len()].copy_from_slice(e.name.as_bytes());
            let tail = RawEntryTail {
                index: e.index as f64,
                length: e.length as f64,
                offset: e.offset as f64,
                reserved: 0.0,
            };
            // Slots sized for three tail words drop the reserved word.
            let tail = bytemuck::bytes_of(&tail);
            let fit = tail.len().min(rest.len());
            rest[..fit].copy_from_slice(&tail[..fit]);
            self.sink.write_all(&slot)?;
        }

        let header = self.template.header(self.pending.len(), directory_offset);
        self.sink.seek(SeekFrom::Start(0))?;
        self.sink.write_all(bytemuck::bytes_of(&header.to_raw()))?;
        log::debug!(
            "wrote {} arrays, directory at word {}",
            self.pending.len(),
            directory_offset
        );
        self.sink.seek(SeekFrom::End(0))?;
        self.sink.flush()?;
        Ok(self.sink)
    }
}

fn write_zero_words<W: Write>(sink: &mut W, words: u64) -> Result<(), PioError> {
    let zeros = [0u8; WORD_BYTES as usize];
    for _ in 0..words {
        sink.write_all(&zeros)?;
    }
    Ok(())
}

/// Copy every array of `src` into `dst` in directory order, then append one
/// new array `name_index` holding `data`.
///
/// The header template (name width, lengths, date, signature) is taken from
/// `src`, so the result is readable by the same tools as the input.
pub fn append_cell_array<R, W>(
    src: &mut PioFile<R>,
    dst: W,
    name: &str,
    index: u32,
    data: &[f64],
) -> Result<W, PioError>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let mut writer = PioWriter::new(dst, HeaderTemplate::from(src.header()))?;
    let entries = src.entries().to_vec();
    for e in &entries {
        let values = src.read_array(&e.name, e.index)?;
        writer.write_array(&e.name, e.index, &values)?;
    }
    writer.write_array(name, index, data)?;
    writer.finish()
}
