use crate::mesh::{parent_dir, write_obj, write_stl};
use crate::meshlab::MeshlabServer;
use std::path::{Path, PathBuf};
use stepmesh_base::{ExportError, MeshFormat};
use stepmesh_pipeline::MeshExporter;
use tempfile::TempDir;
use tracing::debug;
use truck_polymesh::PolygonMesh;

const SIMPLE_SUFFIX: &str = "_simple";
const HULL_SUFFIX: &str = "_hull";

/// Writes STL and OBJ through truck and hands AMF and DAE to meshlab.
///
/// Optionally derives a simplified mesh and a convex hull with meshlab
/// filter scripts; both are written as STL next to the part's meshes.
#[derive(Clone, Debug, Default)]
pub struct MeshWriter {
    meshlab: MeshlabServer,
    simplify: Option<SimplifyScript>,
    hull_script: Option<PathBuf>,
}

#[derive(Clone, Debug)]
struct SimplifyScript {
    script: PathBuf,
    iterations: u32,
}

impl MeshWriter {
    pub fn new(meshlab: MeshlabServer) -> Self {
        Self {
            meshlab,
            simplify: None,
            hull_script: None,
        }
    }

    /// Applies `script` `iterations` times (at least once) to produce
    /// `<part>_simple.stl`.
    pub fn with_simplify_script(mut self, script: impl Into<PathBuf>, iterations: u32) -> Self {
        self.simplify = Some(SimplifyScript {
            script: script.into(),
            iterations: iterations.max(1),
        });
        self
    }

    /// Applies `script` to produce `<part>_hull.stl`, from the simplified
    /// mesh when one is configured.
    pub fn with_hull_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.hull_script = Some(script.into());
        self
    }

    fn convert_with_meshlab(
        &self,
        mesh: &PolygonMesh,
        format: MeshFormat,
        path: &Path,
    ) -> Result<(), ExportError> {
        let scratch = scratch_dir(path)?;
        let source = scratch.path().join("source.stl");
        write_stl(mesh, &source)?;

        let converted = scratch
            .path()
            .join(format!("converted.{}", format.extension()));
        self.meshlab.convert(&source, &converted)?;
        publish(&converted, path)
    }

    fn run_simplify(
        &self,
        simplify: &SimplifyScript,
        input: &Path,
        scratch: &Path,
        stem: &str,
    ) -> Result<PathBuf, ExportError> {
        let mut current = input.to_path_buf();
        for pass in 1..=simplify.iterations {
            let next = scratch.join(format!("{stem}_{pass}.stl"));
            debug!(pass, iterations = simplify.iterations, "simplifying mesh");
            self.meshlab.apply_script(&current, &simplify.script, &next)?;
            current = next;
        }
        Ok(current)
    }
}

impl MeshExporter<PolygonMesh> for MeshWriter {
    fn write(&self, mesh: &PolygonMesh, format: MeshFormat, path: &Path) -> Result<(), ExportError> {
        match format {
            MeshFormat::Stl => write_stl(mesh, path),
            MeshFormat::Obj => write_obj(mesh, path),
            MeshFormat::Amf | MeshFormat::Dae => self.convert_with_meshlab(mesh, format, path),
        }
    }

    fn derived_suffixes(&self) -> Vec<&'static str> {
        let mut suffixes = Vec::new();
        if self.simplify.is_some() {
            suffixes.push(SIMPLE_SUFFIX);
        }
        if self.hull_script.is_some() {
            suffixes.push(HULL_SUFFIX);
        }
        suffixes
    }

    fn derive(
        &self,
        name: &str,
        mesh: &PolygonMesh,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExportError> {
        if self.simplify.is_none() && self.hull_script.is_none() {
            return Ok(Vec::new());
        }

        let scratch = scratch_dir(&out_dir.join(name))?;
        let full = scratch.path().join("full.stl");
        write_stl(mesh, &full)?;

        let mut written = Vec::new();
        let mut source = full;
        if let Some(simplify) = &self.simplify {
            let simple = self.run_simplify(simplify, &source, scratch.path(), "simple")?;
            let target = out_dir.join(format!("{name}{SIMPLE_SUFFIX}.stl"));
            let staged = scratch.path().join("simple.stl");
            std::fs::copy(&simple, &staged).map_err(|err| ExportError::io(&target, err))?;
            publish(&staged, &target)?;
            written.push(target);
            source = simple;
        }

        if let Some(script) = &self.hull_script {
            let mut hull = scratch.path().join("hull.stl");
            self.meshlab.apply_script(&source, script, &hull)?;
            if let Some(simplify) = &self.simplify {
                hull = self.run_simplify(simplify, &hull, scratch.path(), "hull_simple")?;
            }
            let target = out_dir.join(format!("{name}{HULL_SUFFIX}.stl"));
            publish(&hull, &target)?;
            written.push(target);
        }
        Ok(written)
    }
}

/// Scratch directory beside `path`, so finished files can be renamed into place.
fn scratch_dir(path: &Path) -> Result<TempDir, ExportError> {
    tempfile::Builder::new()
        .prefix(".stepmesh-")
        .tempdir_in(parent_dir(path))
        .map_err(|err| ExportError::io(path, err))
}

fn publish(from: &Path, to: &Path) -> Result<(), ExportError> {
    std::fs::rename(from, to).map_err(|err| ExportError::io(to, err))
}
