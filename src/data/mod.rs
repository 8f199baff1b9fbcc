//! Data module: per-cell material layout
#![warn(missing_docs)]

pub mod material;

pub use material::{MaterialCsr, MaterialMap};
