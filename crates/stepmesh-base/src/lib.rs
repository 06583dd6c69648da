use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_TESSELLATION_TOLERANCE: f64 = 0.5;

/// Mesh file formats a part can be exported to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshFormat {
    Stl,
    Amf,
    Dae,
    Obj,
}

impl MeshFormat {
    pub const ALL: [MeshFormat; 4] = [
        MeshFormat::Stl,
        MeshFormat::Amf,
        MeshFormat::Dae,
        MeshFormat::Obj,
    ];

    pub const fn extension(self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::Amf => "amf",
            MeshFormat::Dae => "dae",
            MeshFormat::Obj => "obj",
        }
    }
}

impl std::fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for MeshFormat {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim().trim_start_matches('.');
        MeshFormat::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(text))
            .ok_or_else(|| Error::UnknownFormat(text.to_string()))
    }
}

/// Ordered, duplicate-free list of requested formats.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FormatSet(Vec<MeshFormat>);

impl FormatSet {
    pub fn new(formats: impl IntoIterator<Item = MeshFormat>) -> Self {
        let mut unique = Vec::new();
        for format in formats {
            if !unique.contains(&format) {
                unique.push(format);
            }
        }
        Self(unique)
    }

    pub fn all() -> Self {
        Self(MeshFormat::ALL.to_vec())
    }

    pub fn iter(&self) -> impl Iterator<Item = MeshFormat> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FormatSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Chordal tolerance handed to the tessellator, in model units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerance(f64);

impl Tolerance {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "tolerance must be a finite number > 0, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub const fn get(self) -> f64 {
        self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(DEFAULT_TESSELLATION_TOLERANCE)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("unknown mesh format `{0}` (expected one of stl, amf, dae, obj)")]
    UnknownFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The input document could not be opened.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("STEP file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read STEP file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a valid STEP file: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("STEP file {} has no DATA section", .path.display())]
    NoData { path: PathBuf },
}

/// A part's geometry could not be turned into a mesh.
#[derive(Error, Debug)]
pub enum TessellationError {
    #[error("shell #{0} is missing from the document")]
    MissingShell(u64),
    #[error("failed to convert shell into topology: {0}")]
    Conversion(String),
    #[error("{failed} of {total} faces could not be triangulated")]
    FailedFaces { failed: usize, total: usize },
    #[error("triangulation produced an empty mesh")]
    EmptyMesh,
}

/// A mesh could not be written in a requested format.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no writer available for {0} meshes")]
    Unsupported(MeshFormat),
    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} is not available")]
    ToolUnavailable { tool: String },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("expected output {} was not produced", .path.display())]
    MissingOutput { path: PathBuf },
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
