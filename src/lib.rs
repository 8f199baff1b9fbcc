#![cfg_attr(docsrs, feature(doc_cfg))]
//! # pio-mesh
//!
//! pio-mesh reads, writes and interprets PIO dumps: the binary snapshot
//! format of an adaptive-mesh-refinement hydrodynamics code. A dump is a
//! header, a directory of named and indexed `f64` arrays, and the flat array
//! data; the mesh layer on top rebuilds the AMR level hierarchy, a canonical
//! cell ordering, the sparse per-cell material encoding, and decomposition
//! quality metrics.
//!
//! ## Features
//! - Seek-based codec with ranged reads and a directory-consistent writer
//! - Level extents, leaf cells per level, and root mesh shape
//! - Processor-count independent cell ordering for comparing dumps
//! - Compressed-row material decoding with global slot offsets across ranks
//! - Clone (ghost) cell counting for stored or synthetic decompositions
//! - Pluggable communication backends (serial, in-process, MPI)
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! pio-mesh = "0.3"
//! # Optional features:
//! # features = ["mpi-support","rayon"]
//! ```
//!
//! ```no_run
//! use pio_mesh::prelude::*;
//!
//! # fn main() -> Result<(), PioError> {
//! let mut mesh = PioMesh::open("dump.pio", PioMeshConfig::default())?;
//! let vol = mesh.material_field("chunk_vol")?;
//! println!("{} cells, {} materials", mesh.n_cell(), vol.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Missing data
//! Fields absent from the directory read as empty arrays and reads past the
//! end of a file return the available words with a `log` warning. Errors are
//! reserved for data that cannot be interpreted at all.

pub mod algs;
pub mod config;
pub mod data;
pub mod io;
pub mod mesh;
pub mod mesh_error;
pub mod partitioning;
pub mod table;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::hierarchy::{LeafLevels, LevelHierarchy};
    pub use crate::config::{FieldNames, NameFallback, PioMeshConfig};
    pub use crate::data::material::{MaterialCsr, MaterialMap};
    pub use crate::io::{HeaderTemplate, PioFile, PioHeader, PioWriter, append_cell_array};
    pub use crate::mesh::PioMesh;
    pub use crate::mesh_error::PioError;
    pub use crate::partitioning::{CloneStats, ProcessorAssignment, synthetic_partition};
    pub use crate::table::{Handle, PioTable};
}
