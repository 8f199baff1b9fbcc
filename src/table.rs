//! Caller-owned table of open dumps addressed by small integer handles.
//!
//! This is the query surface for tools that cannot hold a [`PioMesh`]
//! directly. Every getter returns an owned buffer; releasing it is dropping
//! it. Handles are never reused within one table.

use crate::config::PioMeshConfig;
use crate::data::material::MaterialMap;
use crate::mesh::PioMesh;
use crate::mesh_error::PioError;
use hashbrown::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Identifies one open dump in a [`PioTable`].
pub type Handle = u32;

#[derive(Debug, Default)]
pub struct PioTable {
    meshes: HashMap<Handle, PioMesh<BufReader<File>>>,
    next: Handle,
}

impl PioTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a dump and register it.
    pub fn open(&mut self, path: impl AsRef<Path>, config: PioMeshConfig) -> Result<Handle, PioError> {
        let mesh = PioMesh::open(path, config)?;
        Ok(self.insert(mesh))
    }

    /// Register an already built interface.
    pub fn insert(&mut self, mesh: PioMesh<BufReader<File>>) -> Handle {
        let handle = self.next;
        self.next += 1;
        self.meshes.insert(handle, mesh);
        handle
    }

    /// Close a dump, releasing its file.
    pub fn close(&mut self, handle: Handle) -> Result<(), PioError> {
        self.meshes
            .remove(&handle)
            .map(drop)
            .ok_or(PioError::UnknownHandle(handle))
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn get(&self, handle: Handle) -> Result<&PioMesh<BufReader<File>>, PioError> {
        self.meshes.get(&handle).ok_or(PioError::UnknownHandle(handle))
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut PioMesh<BufReader<File>>, PioError> {
        self.meshes
            .get_mut(&handle)
            .ok_or(PioError::UnknownHandle(handle))
    }

    pub fn n_cell(&self, handle: Handle) -> Result<usize, PioError> {
        Ok(self.get(handle)?.n_cell())
    }

    pub fn n_dim(&self, handle: Handle) -> Result<usize, PioError> {
        Ok(self.get(handle)?.n_dim())
    }

    pub fn n_mat(&self, handle: Handle) -> Result<usize, PioError> {
        Ok(self.get(handle)?.n_mat())
    }

    pub fn field_width(&self, handle: Handle, name: &str) -> Result<u64, PioError> {
        Ok(self.get(handle)?.field_width(name))
    }

    pub fn field_length(&self, handle: Handle, name: &str) -> Result<u64, PioError> {
        Ok(self.get(handle)?.field_length(name))
    }

    pub fn exists(&self, handle: Handle, name: &str, index: u32) -> Result<bool, PioError> {
        Ok(self.get(handle)?.exists(name, index))
    }

    pub fn daughter(&self, handle: Handle) -> Result<Vec<i64>, PioError> {
        Ok(self.get(handle)?.daughters().to_vec())
    }

    /// Center coordinate `d` (0-based); empty past the last dimension.
    pub fn center(&self, handle: Handle, d: usize) -> Result<Vec<f64>, PioError> {
        Ok(self.get(handle)?.center(d).map(<[f64]>::to_vec).unwrap_or_default())
    }

    pub fn get_f64(&mut self, handle: Handle, name: &str, index: u32) -> Result<Vec<f64>, PioError> {
        self.get_mut(handle)?.get_field(name, index)
    }

    pub fn get_range_f64(
        &mut self,
        handle: Handle,
        name: &str,
        index: u32,
        start: usize,
        count: usize,
    ) -> Result<Vec<f64>, PioError> {
        self.get_mut(handle)?.get_field_range(name, index, start, count)
    }

    pub fn get_i64(&mut self, handle: Handle, name: &str, index: u32) -> Result<Vec<i64>, PioError> {
        self.get_mut(handle)?.get_field_i64(name, index)
    }

    pub fn get_range_i64(
        &mut self,
        handle: Handle,
        name: &str,
        index: u32,
        start: usize,
        count: usize,
    ) -> Result<Vec<i64>, PioError> {
        self.get_mut(handle)?
            .get_field_range_i64(name, index, start, count)
    }

    pub fn get_matvar(&mut self, handle: Handle, name: &str) -> Result<MaterialMap, PioError> {
        self.get_mut(handle)?.material_field(name)
    }

    pub fn get_range_matvar(
        &mut self,
        handle: Handle,
        name: &str,
        start: usize,
        count: usize,
    ) -> Result<MaterialMap, PioError> {
        self.get_mut(handle)?.material_field_range(name, start, count)
    }

    pub fn get_matvar_index(
        &mut self,
        handle: Handle,
        name: &str,
        id: i64,
    ) -> Result<Vec<f64>, PioError> {
        self.get_mut(handle)?.material_field_index(name, id)
    }

    pub fn get_range_matvar_index(
        &mut self,
        handle: Handle,
        name: &str,
        id: i64,
        start: usize,
        count: usize,
    ) -> Result<Vec<f64>, PioError> {
        self.get_mut(handle)?
            .material_field_index_range(name, id, start, count)
    }
}
