use crate::step::StepBody;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use stepmesh_base::{ExportError, TessellationError};
use truck_meshalgo::prelude::*;
use truck_polymesh::stl::StlType;
use truck_polymesh::{PolygonMesh, obj, stl};

pub fn triangulate_body(body: &StepBody, tol: f64) -> Result<PolygonMesh, TessellationError> {
    let holder = body
        .table
        .shell
        .get(&body.shell_id)
        .ok_or(TessellationError::MissingShell(body.shell_id))?;
    let shell = body
        .table
        .to_compressed_shell(holder)
        .map_err(|err| TessellationError::Conversion(err.to_string()))?;

    let triangulated = shell.robust_triangulation(tol);
    let total = triangulated.faces.len();
    let failed = triangulated
        .faces
        .iter()
        .filter(|face| face.surface.is_none())
        .count();
    if failed > 0 {
        return Err(TessellationError::FailedFaces { failed, total });
    }

    let mut mesh = triangulated.to_polygon();
    mesh.add_naive_normals(true);
    mesh.put_together_same_attrs(truck_base::tolerance::TOLERANCE);
    mesh.remove_unused_attrs();
    if mesh.positions().is_empty() || mesh.faces().len() == 0 {
        return Err(TessellationError::EmptyMesh);
    }
    Ok(mesh)
}

/// Writes `mesh` as binary STL to `path`.
pub fn write_stl(mesh: &PolygonMesh, path: &Path) -> Result<(), ExportError> {
    write_atomically(path, |file| {
        let mut writer = BufWriter::new(file);
        stl::write(mesh, &mut writer, StlType::Binary).map_err(|err| encode_failed(path, err))?;
        writer.flush().map_err(|err| ExportError::io(path, err))
    })
}

/// Writes `mesh` as Wavefront OBJ to `path`.
pub fn write_obj(mesh: &PolygonMesh, path: &Path) -> Result<(), ExportError> {
    write_atomically(path, |file| {
        let mut writer = BufWriter::new(file);
        obj::write(mesh, &mut writer).map_err(|err| encode_failed(path, err))?;
        writer.flush().map_err(|err| ExportError::io(path, err))
    })
}

fn encode_failed(path: &Path, err: impl std::fmt::Display) -> ExportError {
    ExportError::io(path, std::io::Error::other(err.to_string()))
}

/// Runs `write` against a temporary file next to `path` and moves it into
/// place only once `write` succeeded.
fn write_atomically<F>(path: &Path, write: F) -> Result<(), ExportError>
where
    F: FnOnce(&mut File) -> Result<(), ExportError>,
{
    let mut staged = tempfile::Builder::new()
        .prefix(".stepmesh-")
        .tempfile_in(parent_dir(path))
        .map_err(|err| ExportError::io(path, err))?;
    write(staged.as_file_mut())?;
    staged
        .persist(path)
        .map_err(|err| ExportError::io(path, err.error))?;
    Ok(())
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
