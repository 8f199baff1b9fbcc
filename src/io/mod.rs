//! PIO dump codec.
//!
//! A dump is a fixed header, a flat data region of word-aligned `f64`
//! arrays, and a directory table locating each `(name, sub-index)` array:
//!
//! ```text
//! word 0            header (11 words, padded to `header_words`)
//! header_words ..   array data, one contiguous block per directory entry
//! directory_offset  `n_arrays` entries, `entry_words` apart:
//!                   name (`name_width` bytes, blank filled),
//!                   sub-index, length, word offset, reserved
//! ```

pub mod header;
pub mod reader;
pub mod writer;

pub use header::{PioHeader, WORD_BYTES};
pub use reader::{ArrayDims, DirectoryEntry, PioFile, field_key};
pub use writer::{HeaderTemplate, PioWriter, append_cell_array};
