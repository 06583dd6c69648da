use crate::mesh::triangulate_body;
use crate::names::DocumentIndex;
use ruststep::parser::parse;
use std::io::ErrorKind;
use std::path::Path;
use std::rc::Rc;
use stepmesh_base::{LoadError, TessellationError, Tolerance};
use stepmesh_pipeline::{GeometryLoader, RawPart};
use tracing::debug;
use truck_polymesh::PolygonMesh;
use truck_stepio::r#in::Table;

/// One shell of an imported STEP document.
///
/// Conversion into truck topology is deferred to tessellation so that a
/// broken body only fails its own part.
#[derive(Clone)]
pub struct StepBody {
    pub(crate) table: Rc<Table>,
    pub(crate) shell_id: u64,
}

impl StepBody {
    pub fn shell_id(&self) -> u64 {
        self.shell_id
    }
}

impl std::fmt::Debug for StepBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepBody")
            .field("shell_id", &self.shell_id)
            .finish_non_exhaustive()
    }
}

/// Reads `path` and returns its bodies in ascending shell entity id.
///
/// Bodies are the outer shells of the document's solids. Files without any
/// solid (surface-model exports) yield every shell instead.
pub fn import_step(path: impl AsRef<Path>) -> Result<Vec<RawPart<StepBody>>, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let exchange = parse(&text).map_err(|err| LoadError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let data = exchange.data.first().ok_or_else(|| LoadError::NoData {
        path: path.to_path_buf(),
    })?;

    let table = Rc::new(Table::from_data_section(data));
    let index = DocumentIndex::new(data);

    let mut shells = index.solid_shells();
    if shells.is_empty() {
        shells = table.shell.keys().copied().collect();
        shells.sort_unstable();
    }
    debug!(path = %path.display(), bodies = shells.len(), entities = data.entities.len(), "STEP data indexed");

    Ok(shells
        .into_iter()
        .map(|shell_id| {
            RawPart::new(
                index.label_for_shell(shell_id),
                StepBody {
                    table: Rc::clone(&table),
                    shell_id,
                },
            )
        })
        .collect())
}

/// The truck kernel as the pipeline's CAD engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct StepLoader;

impl GeometryLoader for StepLoader {
    type Geometry = StepBody;
    type Mesh = PolygonMesh;

    fn load(&self, path: &Path) -> Result<Vec<RawPart<StepBody>>, LoadError> {
        import_step(path)
    }

    fn tessellate(
        &self,
        body: &StepBody,
        tolerance: Tolerance,
    ) -> Result<PolygonMesh, TessellationError> {
        triangulate_body(body, tolerance.get())
    }
}
