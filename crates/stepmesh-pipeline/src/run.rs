use crate::engine::{GeometryLoader, MeshExporter, Part};
use crate::parts::PartEnumerator;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use stepmesh_base::{FormatSet, LoadError, MeshFormat, Tolerance};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_OUTPUT_DIR: &str = "meshes";

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub out_dir: PathBuf,
    pub formats: FormatSet,
    pub tolerance: Tolerance,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            formats: FormatSet::all(),
            tolerance: Tolerance::default(),
        }
    }
}

impl ExportOptions {
    pub fn output_path(&self, part_name: &str, format: MeshFormat) -> PathBuf {
        self.out_dir
            .join(format!("{part_name}.{}", format.extension()))
    }
}

/// Failures that abort the whole run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to create output directory {}", .path.display())]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Tessellation,
    Export,
    Derive,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureStage::Tessellation => "tessellation",
            FailureStage::Export => "export",
            FailureStage::Derive => "derive",
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FailureCause {
    pub stage: FailureStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<MeshFormat>,
    pub reason: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PartSuccess {
    pub name: String,
    pub outputs: Vec<PathBuf>,
}

/// A part with at least one failed stage. `outputs` lists the files that
/// were still written for it.
#[derive(Clone, Debug, Serialize)]
pub struct PartFailure {
    pub name: String,
    pub outputs: Vec<PathBuf>,
    pub causes: Vec<FailureCause>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub succeeded: Vec<PartSuccess>,
    pub failed: Vec<PartFailure>,
}

impl RunReport {
    fn new(input: &Path, out_dir: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn part_count(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Exported {} of {} parts from {} to {}",
            self.succeeded.len(),
            self.part_count(),
            self.input.display(),
            self.out_dir.display()
        )?;
        for part in &self.succeeded {
            writeln!(f, "  ok      {} ({} files)", part.name, part.outputs.len())?;
        }
        for part in &self.failed {
            for cause in &part.causes {
                match cause.format {
                    Some(format) => writeln!(
                        f,
                        "  failed  {} [{} {}]: {}",
                        part.name, cause.stage, format, cause.reason
                    )?,
                    None => writeln!(
                        f,
                        "  failed  {} [{}]: {}",
                        part.name, cause.stage, cause.reason
                    )?,
                }
            }
        }
        Ok(())
    }
}

/// Loads `input` and exports every part it contains.
///
/// Only output directory creation and document loading abort the run; every
/// per-part failure is recorded in the returned report and the next part is
/// processed.
pub fn run<L, E>(
    loader: &L,
    exporter: &E,
    input: &Path,
    options: &ExportOptions,
) -> Result<RunReport, PipelineError>
where
    L: GeometryLoader,
    E: MeshExporter<L::Mesh>,
{
    std::fs::create_dir_all(&options.out_dir).map_err(|source| {
        PipelineError::CreateOutputDir {
            path: options.out_dir.clone(),
            source,
        }
    })?;

    let raw = loader.load(input)?;
    info!(input = %input.display(), parts = raw.len(), "document loaded");

    let mut report = RunReport::new(input, &options.out_dir);
    for part in PartEnumerator::new(raw).reserving(exporter.derived_suffixes()) {
        export_part(loader, exporter, &part, options, &mut report);
    }
    Ok(report)
}

fn export_part<L, E>(
    loader: &L,
    exporter: &E,
    part: &Part<L::Geometry>,
    options: &ExportOptions,
    report: &mut RunReport,
) where
    L: GeometryLoader,
    E: MeshExporter<L::Mesh>,
{
    let mesh = match loader.tessellate(&part.geometry, options.tolerance) {
        Ok(mesh) => mesh,
        Err(err) => {
            let reason = describe(&err);
            warn!(part = %part.name, %reason, "tessellation failed");
            report.failed.push(PartFailure {
                name: part.name.clone(),
                outputs: Vec::new(),
                causes: vec![FailureCause {
                    stage: FailureStage::Tessellation,
                    format: None,
                    reason,
                }],
            });
            return;
        }
    };

    let mut outputs = Vec::new();
    let mut causes = Vec::new();
    for format in options.formats.iter() {
        let path = options.output_path(&part.name, format);
        match exporter.write(&mesh, format, &path) {
            Ok(()) => {
                debug!(part = %part.name, path = %path.display(), "mesh written");
                outputs.push(path);
            }
            Err(err) => {
                let reason = describe(&err);
                warn!(part = %part.name, %format, %reason, "export failed");
                causes.push(FailureCause {
                    stage: FailureStage::Export,
                    format: Some(format),
                    reason,
                });
            }
        }
    }

    match exporter.derive(&part.name, &mesh, &options.out_dir) {
        Ok(paths) => outputs.extend(paths),
        Err(err) => {
            let reason = describe(&err);
            warn!(part = %part.name, %reason, "derived mesh failed");
            causes.push(FailureCause {
                stage: FailureStage::Derive,
                format: None,
                reason,
            });
        }
    }

    if causes.is_empty() {
        info!(part = %part.name, files = outputs.len(), "part exported");
        report.succeeded.push(PartSuccess {
            name: part.name.clone(),
            outputs,
        });
    } else {
        report.failed.push(PartFailure {
            name: part.name.clone(),
            outputs,
            causes,
        });
    }
}

fn describe(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
