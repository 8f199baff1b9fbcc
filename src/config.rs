//! Configuration for building a mesh interface over a dump.

use serde::{Deserialize, Serialize};

/// Conventional array base names written by the hydrodynamics code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Cell centers, one sub-index per dimension.
    pub center: String,
    /// Refinement level of each cell.
    pub level: String,
    /// Daughter pointer; > 0 marks a refined (mother) cell.
    pub daughter: String,
    /// Neighbors: sub-index `2d+1` is low, `2d+2` is high in dimension `d`.
    pub neighbor: String,
    /// Material definitions; the width is the material count.
    pub material_def: String,
    /// Number of materials in each cell.
    pub material_count: String,
    /// Flat slot-indexed material ids.
    pub material_id: String,
    /// Cells owned by each processor of the run that wrote the dump.
    pub partition: String,
    /// Generated per-cell processor id.
    pub processor_id: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            center: "cell_center".into(),
            level: "cell_level".into(),
            daughter: "cell_daughter".into(),
            neighbor: "cell_index".into(),
            material_def: "matdef".into(),
            material_count: "chunk_nummat".into(),
            material_id: "chunk_mat".into(),
            partition: "global_numcell".into(),
            processor_id: "processor_id".into(),
        }
    }
}

/// Alternate naming tried once when a material field is absent:
/// `<prefix><rest>` is retried as `<replacement><rest>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameFallback {
    pub prefix: String,
    pub replacement: String,
}

impl Default for NameFallback {
    fn default() -> Self {
        Self {
            prefix: "chunk_".into(),
            replacement: "frac_".into(),
        }
    }
}

impl NameFallback {
    /// The alternate name for `field`, if it carries the prefix.
    pub fn alternate(&self, field: &str) -> Option<String> {
        field
            .strip_prefix(self.prefix.as_str())
            .map(|rest| format!("{}{}", self.replacement, rest))
    }
}

/// Options for [`PioMesh`](crate::mesh::PioMesh) construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PioMeshConfig {
    /// Build the processor-count independent cell ordering on open.
    pub unique_ids: bool,
    pub fields: FieldNames,
    pub material_fallback: Option<NameFallback>,
}

impl Default for PioMeshConfig {
    fn default() -> Self {
        Self {
            unique_ids: false,
            fields: FieldNames::default(),
            material_fallback: Some(NameFallback::default()),
        }
    }
}

impl PioMeshConfig {
    /// Default configuration with the canonical ordering enabled.
    pub fn with_unique_ids() -> Self {
        Self {
            unique_ids: true,
            ..Self::default()
        }
    }
}
