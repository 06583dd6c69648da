//! Orchestration of the STEP to mesh conversion.
//!
//! The pipeline only sequences calls to a [`GeometryLoader`] and a
//! [`MeshExporter`]; the CAD kernel and the mesh tools live behind those
//! traits.

pub mod engine;
pub mod parts;
pub mod run;

pub use engine::{GeometryLoader, MeshExporter, Part, RawPart};
pub use parts::{PartEnumerator, sanitize_name};
pub use run::{
    DEFAULT_OUTPUT_DIR, ExportOptions, FailureCause, FailureStage, PartFailure, PartSuccess,
    PipelineError, RunReport, run,
};
