use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use stepmesh_base::ExportError;
use tracing::debug;

pub const DEFAULT_MESHLAB_SERVER: &str = "meshlabserver";

/// Keeps at most this many trailing bytes of the tool's stderr in errors.
const STDERR_TAIL: usize = 2048;

/// The `meshlabserver` command line tool.
///
/// Every invocation asks for vertex and face normals in the output
/// (`-om vn fn`); meshlab picks the output format from the file extension.
#[derive(Clone, Debug)]
pub struct MeshlabServer {
    program: PathBuf,
}

impl Default for MeshlabServer {
    fn default() -> Self {
        Self::new(DEFAULT_MESHLAB_SERVER)
    }
}

impl MeshlabServer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Converts `input` into the format implied by `output`'s extension.
    pub fn convert(&self, input: &Path, output: &Path) -> Result<(), ExportError> {
        self.run(input, output, None)
    }

    /// Runs the filter script `script` on `input`, writing `output`.
    pub fn apply_script(&self, input: &Path, script: &Path, output: &Path) -> Result<(), ExportError> {
        self.run(input, output, Some(script))
    }

    fn run(&self, input: &Path, output: &Path, script: Option<&Path>) -> Result<(), ExportError> {
        let mut command = Command::new(&self.program);
        command
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .args(["-om", "vn", "fn"]);
        if let Some(script) = script {
            command.arg("-s").arg(script);
        }
        debug!(?command, "running mesh tool");

        let result = command.output().map_err(|err| match err.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => ExportError::ToolUnavailable {
                tool: self.tool_name(),
            },
            _ => ExportError::io(&self.program, err),
        })?;

        let stdout = String::from_utf8_lossy(&result.stdout);
        let stderr = String::from_utf8_lossy(&result.stderr);
        if !stdout.trim().is_empty() {
            debug!(output = %stdout.trim_end(), "mesh tool stdout");
        }
        if !result.status.success() {
            return Err(ExportError::ToolFailed {
                tool: self.tool_name(),
                status: result.status.to_string(),
                stderr: tail(stderr.trim(), STDERR_TAIL).to_string(),
            });
        }
        if !stderr.trim().is_empty() {
            debug!(output = %stderr.trim_end(), "mesh tool stderr");
        }
        if !output.is_file() {
            return Err(ExportError::MissingOutput {
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }

    fn tool_name(&self) -> String {
        self.program.display().to_string()
    }
}

fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
