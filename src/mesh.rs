//! Mesh interface over an open dump.
//!
//! [`PioMesh`] owns the [`PioFile`] for its whole lifetime and loads the
//! arrays every query needs up front: cell levels, daughters, centers, and
//! the material layout of this rank's cell block. Everything else is read
//! on demand with fresh I/O per call.
//!
//! Construction is all-or-nothing. Any failure comes back as
//! [`PioError::Construction`] naming the dump, and no interface is built.

use crate::algs::communicator::{Communicator, NoComm};
use crate::algs::hierarchy::{
    CellLayout, LeafLevels, LevelHierarchy, PADDED_DIMS, cell_layout, leaves_by_level,
    root_mesh_size,
};
use crate::algs::renumber::{apply_permutation, unique_spatial_map};
use crate::algs::slot_offsets::{exchange_slot_offset, rank_block};
use crate::config::PioMeshConfig;
use crate::data::material::{MaterialCsr, MaterialMap};
use crate::io::reader::{PioFile, field_key};
use crate::mesh_error::PioError;
use crate::partitioning::{CloneStats, NeighborArrays, ProcessorAssignment, count_clones};
use once_cell::sync::OnceCell;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Stand-in path reported for dumps that did not come from disk.
const STREAM_PATH: &str = "<stream>";

/// A dump interpreted as an AMR mesh.
#[derive(Debug)]
pub struct PioMesh<R = BufReader<File>> {
    file: PioFile<R>,
    config: PioMeshConfig,
    layout: CellLayout,
    levels: Vec<i64>,
    daughters: Vec<i64>,
    centers: Vec<Vec<f64>>,
    hierarchy: LevelHierarchy,
    /// Cells whose material layout this rank holds.
    block: Range<usize>,
    /// File slot of the first material slot of `block`.
    slot_offset: u64,
    materials: MaterialCsr,
    unique_map: OnceCell<Vec<usize>>,
}

impl PioMesh<BufReader<File>> {
    /// Open a dump on disk for serial use.
    pub fn open(path: impl AsRef<Path>, config: PioMeshConfig) -> Result<Self, PioError> {
        Self::open_with_comm(path, config, &NoComm)
    }

    /// Open a dump on disk as one rank of `comm`. Collective.
    pub fn open_with_comm<C: Communicator>(
        path: impl AsRef<Path>,
        config: PioMeshConfig,
        comm: &C,
    ) -> Result<Self, PioError> {
        let path = path.as_ref();
        let file = PioFile::open(path).map_err(|e| e.during_construction(path))?;
        Self::from_file(file, config, comm)
    }
}

impl<R: Read + Seek> PioMesh<R> {
    /// Build from an in-memory or otherwise non-file source, serially.
    pub fn from_reader(source: R, config: PioMeshConfig) -> Result<Self, PioError> {
        let file = PioFile::from_reader(source).map_err(|e| e.during_construction(STREAM_PATH))?;
        Self::from_file(file, config, &NoComm)
    }

    /// Build from an already decoded dump. Collective over `comm` when the
    /// dump carries materials.
    pub fn from_file<C: Communicator>(
        file: PioFile<R>,
        config: PioMeshConfig,
        comm: &C,
    ) -> Result<Self, PioError> {
        let path = file
            .path()
            .map_or_else(|| PathBuf::from(STREAM_PATH), Path::to_path_buf);
        Self::build(file, config, comm).map_err(|e| e.during_construction(path))
    }

    fn build<C: Communicator>(
        mut file: PioFile<R>,
        config: PioMeshConfig,
        comm: &C,
    ) -> Result<Self, PioError> {
        let names = &config.fields;
        let layout = cell_layout(&file, &names.center);
        if layout.ndim == 0 {
            return Err(PioError::MissingField(field_key(&names.center, 1)));
        }
        if layout.ndim > PADDED_DIMS {
            return Err(PioError::CorruptDirectory {
                entry: 0,
                reason: format!("{} has {} components", names.center, layout.ndim),
            });
        }
        let num_cell = layout.num_cell;

        let levels = read_required(&mut file, &names.level, 0, num_cell)?;
        let daughters = read_required(&mut file, &names.daughter, 0, num_cell)?;
        let centers = (1..=layout.ndim as u32)
            .map(|d| -> Result<Vec<f64>, PioError> {
                let values = file.read_array(&names.center, d)?;
                check_cell_count(&field_key(&names.center, d), values.len(), num_cell)?;
                Ok(values)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let hierarchy = LevelHierarchy::build(&levels, &centers);
        log::info!(
            "ndim = {}, numcell = {}, nLevel = {}",
            layout.ndim,
            num_cell,
            hierarchy.n_level()
        );

        let n_material = file.field_width(&names.material_def) as usize;
        let block = rank_block(num_cell, comm.rank(), comm.size());
        let (materials, slot_offset) = if file.exists(&names.material_count, 0) {
            let counts: Vec<i64> = file.read_typed_range(
                &names.material_count,
                0,
                block.start as u64,
                Some(block.len() as u64),
            )?;
            let local_total: i64 = counts.iter().sum();
            let local_total = u64::try_from(local_total).map_err(|_| {
                PioError::MaterialLayout(format!("negative slot total {local_total}"))
            })?;
            let offset = exchange_slot_offset(comm, local_total)?;
            let ids: Vec<i64> =
                file.read_typed_range(&names.material_id, 0, offset, Some(local_total))?;
            (MaterialCsr::new(&counts, ids, n_material)?, offset)
        } else {
            log::debug!("no {} field; mesh has no material layout", names.material_count);
            (MaterialCsr::empty(block.len(), n_material), 0)
        };

        let mesh = Self {
            file,
            layout,
            levels,
            daughters,
            centers,
            hierarchy,
            block,
            slot_offset,
            materials,
            unique_map: OnceCell::new(),
            config,
        };
        if mesh.config.unique_ids {
            mesh.unique_map()?;
        }
        Ok(mesh)
    }
}

fn read_required<R: Read + Seek>(
    file: &mut PioFile<R>,
    name: &str,
    index: u32,
    num_cell: usize,
) -> Result<Vec<i64>, PioError> {
    if !file.exists(name, index) {
        return Err(PioError::MissingField(field_key(name, index)));
    }
    let values: Vec<i64> = file.read_typed(name, index)?;
    check_cell_count(&field_key(name, index), values.len(), num_cell)?;
    Ok(values)
}

fn check_cell_count(field: &str, found: usize, num_cell: usize) -> Result<(), PioError> {
    if found != num_cell {
        return Err(PioError::LengthMismatch {
            field: field.to_owned(),
            expected: num_cell,
            found,
        });
    }
    Ok(())
}

impl<R> PioMesh<R> {
    pub fn n_dim(&self) -> usize {
        self.layout.ndim
    }

    pub fn n_cell(&self) -> usize {
        self.layout.num_cell
    }

    /// Highest refinement level present.
    pub fn n_level(&self) -> usize {
        self.hierarchy.n_level()
    }

    /// System-wide material count (width of the material definition field).
    pub fn n_mat(&self) -> usize {
        self.materials.n_material()
    }

    pub fn config(&self) -> &PioMeshConfig {
        &self.config
    }

    pub fn file(&self) -> &PioFile<R> {
        &self.file
    }

    pub fn hierarchy(&self) -> &LevelHierarchy {
        &self.hierarchy
    }

    /// Cell extent of each level.
    pub fn dxyz(&self) -> &[[f64; PADDED_DIMS]] {
        self.hierarchy.dxyz()
    }

    pub fn levels(&self) -> &[i64] {
        &self.levels
    }

    pub fn daughters(&self) -> &[i64] {
        &self.daughters
    }

    /// Centers as `centers()[d][cell]`.
    pub fn centers(&self) -> &[Vec<f64>] {
        &self.centers
    }

    /// Center coordinate `d` (0-based) of every cell.
    pub fn center(&self, d: usize) -> Option<&[f64]> {
        self.centers.get(d).map(Vec::as_slice)
    }

    /// Material layout of [`rank_block`](Self::rank_block).
    pub fn materials(&self) -> &MaterialCsr {
        &self.materials
    }

    /// Cells this rank resolves material queries for.
    pub fn rank_block(&self) -> Range<usize> {
        self.block.clone()
    }

    /// File slot of the first material slot of this rank's block.
    pub fn slot_offset(&self) -> u64 {
        self.slot_offset
    }

    pub fn exists(&self, name: &str, index: u32) -> bool {
        self.file.exists(name, index)
    }

    pub fn field_width(&self, name: &str) -> u64 {
        self.file.field_width(name)
    }

    pub fn field_length(&self, name: &str) -> u64 {
        self.file.field_length(name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.file.field_names()
    }

    pub fn list_fields<W: Write>(&self, out: W) -> io::Result<()> {
        self.file.list_fields(out)
    }

    /// Canonical permutation, built on first use.
    pub fn unique_map(&self) -> Result<&[usize], PioError> {
        self.unique_map
            .get_or_try_init(|| unique_spatial_map(&self.centers, &self.hierarchy))
            .map(Vec::as_slice)
    }

    /// Reorder a per-cell array into canonical order.
    pub fn apply_unique_map<T: Copy>(&self, field: &[T]) -> Result<Vec<T>, PioError> {
        apply_permutation(field, self.unique_map()?)
    }

    /// Reorder every component of a multi-component field.
    pub fn apply_unique_map_2d<T: Copy>(&self, fields: &[Vec<T>]) -> Result<Vec<Vec<T>>, PioError> {
        fields.iter().map(|f| self.apply_unique_map(f)).collect()
    }

    pub fn leaves_by_level(&self) -> LeafLevels {
        leaves_by_level(&self.levels, &self.daughters)
    }

    /// Coarse mesh cell count per dimension.
    pub fn root_mesh_size(&self) -> Vec<usize> {
        root_mesh_size(&self.levels, &self.centers)
    }

    pub fn into_file(self) -> PioFile<R> {
        self.file
    }
}

impl<R: Read + Seek> PioMesh<R> {
    /// A whole field; empty if absent.
    pub fn get_field(&mut self, name: &str, index: u32) -> Result<Vec<f64>, PioError> {
        self.file.read_array(name, index)
    }

    /// `count` cells of a field starting at cell `start`.
    pub fn get_field_range(
        &mut self,
        name: &str,
        index: u32,
        start: usize,
        count: usize,
    ) -> Result<Vec<f64>, PioError> {
        self.file
            .read_array_range(name, index, start as u64, Some(count as u64))
    }

    pub fn get_field_i64(&mut self, name: &str, index: u32) -> Result<Vec<i64>, PioError> {
        self.file.read_typed(name, index)
    }

    pub fn get_field_range_i64(
        &mut self,
        name: &str,
        index: u32,
        start: usize,
        count: usize,
    ) -> Result<Vec<i64>, PioError> {
        self.file
            .read_typed_range(name, index, start as u64, Some(count as u64))
    }

    /// Components `1..=width` of a field.
    pub fn get_field_2d(&mut self, name: &str) -> Result<Vec<Vec<f64>>, PioError> {
        self.file.read_field_2d(name)
    }

    pub fn get_string(&mut self, name: &str, index: u32) -> Result<String, PioError> {
        self.file.read_string(name, index)
    }

    /// Name under which a material-valued field is stored, trying the
    /// configured fallback once.
    pub fn resolve_material_field(&self, name: &str) -> Option<String> {
        if self.file.exists(name, 0) {
            return Some(name.to_owned());
        }
        let alt = self
            .config
            .material_fallback
            .as_ref()
            .and_then(|fb| fb.alternate(name))?;
        if self.file.exists(&alt, 0) {
            log::debug!("material field {name} absent, using {alt}");
            return Some(alt);
        }
        None
    }

    /// Per-material dense arrays of a material field over this rank's block.
    pub fn material_field(&mut self, name: &str) -> Result<MaterialMap, PioError> {
        let Range { start, end } = self.block.clone();
        self.material_field_range(name, start, end - start)
    }

    /// Per-material dense arrays over cells `start..start + count`, which
    /// must lie in this rank's block. Empty if the field is absent.
    pub fn material_field_range(
        &mut self,
        name: &str,
        start: usize,
        count: usize,
    ) -> Result<MaterialMap, PioError> {
        let Some((local, values)) = self.material_slots(name, start, count)? else {
            return Ok(MaterialMap::new());
        };
        self.materials.materials_by_id(&values, local, count)
    }

    /// Dense array of material `id` of a material field over this rank's block.
    pub fn material_field_index(&mut self, name: &str, id: i64) -> Result<Vec<f64>, PioError> {
        let Range { start, end } = self.block.clone();
        self.material_field_index_range(name, id, start, end - start)
    }

    /// Ranged variant of [`material_field_index`](Self::material_field_index).
    pub fn material_field_index_range(
        &mut self,
        name: &str,
        id: i64,
        start: usize,
        count: usize,
    ) -> Result<Vec<f64>, PioError> {
        let Some((local, values)) = self.material_slots(name, start, count)? else {
            return Ok(Vec::new());
        };
        self.materials.material_values(&values, id, local, count)
    }

    /// Block-local start cell and the slot values of cells
    /// `start..start + count`, read from their file-relative slot range.
    fn material_slots(
        &mut self,
        name: &str,
        start: usize,
        count: usize,
    ) -> Result<Option<(usize, Vec<f64>)>, PioError> {
        let in_block = start
            .checked_add(count)
            .is_some_and(|end| start >= self.block.start && end <= self.block.end);
        if !in_block {
            return Err(PioError::RangeOutOfBounds {
                start,
                end: start.saturating_add(count),
                len: self.block.end,
            });
        }
        let Some(stored) = self.resolve_material_field(name) else {
            return Ok(None);
        };
        let local = start - self.block.start;
        let slots = self.materials.slot_range(local, count)?;
        let values = self.file.read_array_range(
            &stored,
            0,
            self.slot_offset + slots.start as u64,
            Some(slots.len() as u64),
        )?;
        Ok(Some((local, values)))
    }

    /// Low/high neighbor arrays of every dimension.
    pub fn neighbors(&mut self) -> Result<Vec<NeighborArrays>, PioError> {
        let name = self.config.fields.neighbor.clone();
        (0..self.n_dim() as u32)
            .map(|d| {
                let (lo, hi) = (2 * d + 1, 2 * d + 2);
                for i in [lo, hi] {
                    if !self.file.exists(&name, i) {
                        return Err(PioError::MissingField(field_key(&name, i)));
                    }
                }
                Ok(NeighborArrays {
                    low: self.file.read_typed(&name, lo)?,
                    high: self.file.read_typed(&name, hi)?,
                })
            })
            .collect()
    }

    /// Stored decomposition, or a synthetic one for `nprocs` processors.
    pub fn processor_assignment(
        &mut self,
        nprocs: Option<usize>,
    ) -> Result<ProcessorAssignment, PioError> {
        match nprocs {
            Some(n) => ProcessorAssignment::synthetic(self.n_cell(), self.n_dim(), n),
            None => {
                let name = self.config.fields.partition.clone();
                let sizes: Vec<i64> = self.file.read_typed(&name, 0)?;
                ProcessorAssignment::from_stored(&sizes, self.n_cell())
            }
        }
    }

    /// Clone statistics of the stored decomposition, or of a synthetic one.
    pub fn clone_stats(&mut self, nprocs: Option<usize>) -> Result<CloneStats, PioError> {
        let assignment = self.processor_assignment(nprocs)?;
        let neighbors = self.neighbors()?;
        count_clones(&self.daughters, &neighbors, &assignment)
    }
}
