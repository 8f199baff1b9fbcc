//! PioError: unified error type for pio-mesh public APIs
//!
//! Absent fields and short reads are *not* errors in this crate: the codec
//! returns empty or truncated buffers for those and logs a warning. Errors are
//! reserved for conditions that leave no usable data behind.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for dump codec and mesh operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PioError {
    /// Underlying file or stream failure.
    #[error("I/O error: {0}")]
    Io(String),
    /// The first eight bytes are not the `pio_file` tag.
    #[error("not a PIO dump: file tag is {found:?}")]
    InvalidTag { found: String },
    /// The tag matched but the format marker is not exactly 2.0.
    #[error("PIO dump has right tag but wrong format marker {found}")]
    InvalidMarker { found: String },
    /// Header lengths are inconsistent with the fixed record layout.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),
    /// A directory entry could not be decoded.
    #[error("corrupt directory entry #{entry}: {reason}")]
    CorruptDirectory { entry: usize, reason: String },
    /// A stored value has no counterpart in the requested numeric type.
    #[error("field `{field}` holds {value}, which is not representable as {target}")]
    Unrepresentable {
        field: String,
        value: String,
        target: &'static str,
    },
    /// A name cannot be written into a directory entry.
    #[error("invalid array name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },
    /// A field required to build the mesh interface is not in the dump.
    #[error("required field `{0}` is missing")]
    MissingField(String),
    /// A cell or slot range lies outside the array it addresses.
    #[error("range {start}..{end} out of bounds for length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
    /// Per-processor block sizes do not tile the cell index space.
    #[error("partition covers {covered} cells, mesh has {num_cell}")]
    PartitionMismatch { covered: usize, num_cell: usize },
    /// A neighbor reference points past the last cell.
    #[error("cell {cell} references neighbor {neighbor} (numcell = {num_cell})")]
    NeighborOutOfRange {
        cell: usize,
        neighbor: i64,
        num_cell: usize,
    },
    /// A per-cell array does not hold one value per cell.
    #[error("field `{field}` holds {found} values, mesh has {expected} cells")]
    LengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },
    /// A cell's grid index or spatial key does not fit a 128-bit integer.
    #[error("spatial key of cell {cell} overflows the integer grid")]
    KeyOverflow { cell: usize },
    /// Material counts, ids and values disagree in length.
    #[error("material layout error: {0}")]
    MaterialLayout(String),
    /// A message exchange with another rank failed.
    #[error("communication with rank {neighbor} failed: {source}")]
    CommError {
        neighbor: usize,
        #[source]
        source: CommFailure,
    },
    /// A handle that is not (or no longer) registered in a table.
    #[error("unknown dump handle {0}")]
    UnknownHandle(u32),
    /// Building a mesh interface failed; nothing usable is left behind.
    #[error("error while trying to read {path:?}: {source}")]
    Construction {
        path: PathBuf,
        #[source]
        source: Box<PioError>,
    },
}

/// Payload of [`PioError::CommError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CommFailure(pub String);

impl From<String> for CommFailure {
    fn from(s: String) -> Self {
        CommFailure(s)
    }
}

impl From<std::io::Error> for PioError {
    fn from(e: std::io::Error) -> Self {
        PioError::Io(e.to_string())
    }
}

impl PioError {
    /// Wrap `self` as a construction failure for `path`.
    pub fn during_construction(self, path: impl Into<PathBuf>) -> PioError {
        PioError::Construction {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// True for the two "this is not a valid dump" outcomes of `open`.
    pub fn is_format_invalid(&self) -> bool {
        match self {
            PioError::InvalidTag { .. } | PioError::InvalidMarker { .. } => true,
            PioError::Construction { source, .. } => source.is_format_invalid(),
            _ => false,
        }
    }
}
