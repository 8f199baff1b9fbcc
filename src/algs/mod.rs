//! Mesh interpretation algorithms and the parallel runtime they use.

pub mod communicator;
pub mod hierarchy;
pub mod renumber;
pub mod slot_offsets;
pub mod wire;

pub use hierarchy::{LeafLevels, LevelHierarchy, leaves_by_level, root_mesh_size};
pub use renumber::unique_spatial_map;
pub use slot_offsets::{exchange_slot_offset, rank_block};
