use std::path::{Path, PathBuf};
use stepmesh_base::{ExportError, LoadError, MeshFormat, TessellationError, Tolerance};

/// A body as found in the document, before it has been given a unique name.
#[derive(Clone, Debug)]
pub struct RawPart<G> {
    pub label: Option<String>,
    pub geometry: G,
}

impl<G> RawPart<G> {
    pub fn new(label: Option<String>, geometry: G) -> Self {
        Self { label, geometry }
    }
}

/// A named solid ready for export.
#[derive(Clone, Debug)]
pub struct Part<G> {
    pub name: String,
    pub geometry: G,
}

/// The CAD engine: opens documents and tessellates their bodies.
pub trait GeometryLoader {
    type Geometry;
    type Mesh;

    /// Opens `path` and returns its bodies in document order.
    fn load(&self, path: &Path) -> Result<Vec<RawPart<Self::Geometry>>, LoadError>;

    fn tessellate(
        &self,
        geometry: &Self::Geometry,
        tolerance: Tolerance,
    ) -> Result<Self::Mesh, TessellationError>;
}

/// Writes meshes to disk.
pub trait MeshExporter<M> {
    /// Writes `mesh` as `format` to `path`. On failure nothing is left at `path`.
    fn write(&self, mesh: &M, format: MeshFormat, path: &Path) -> Result<(), ExportError>;

    /// Stem suffixes of the files `derive` writes next to a part's meshes.
    /// Part names are chosen so that no `<name><suffix>` stem is shared with
    /// another part.
    fn derived_suffixes(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Produces extra meshes derived from the part's mesh, returning the paths written.
    fn derive(&self, _name: &str, _mesh: &M, _out_dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        Ok(Vec::new())
    }
}
