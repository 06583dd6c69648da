use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stepmesh_base::{DEFAULT_TESSELLATION_TOLERANCE, FormatSet, MeshFormat, Tolerance};
use stepmesh_io::{DEFAULT_MESHLAB_SERVER, MeshWriter, MeshlabServer, StepLoader};
use stepmesh_pipeline::{DEFAULT_OUTPUT_DIR, ExportOptions, RunReport, run};
use tracing::info;

/// Every part was exported, or the document had none.
const SUCCESS: u8 = 0;
/// Invalid arguments, or the run stopped before exporting any part.
const ABORTED: u8 = 1;
/// The run completed but at least one part failed.
const PARTIAL_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "step-to-meshes")]
#[command(about = "Convert every part of a STEP file into mesh files")]
struct Cli {
    /// STEP file to convert.
    input: PathBuf,

    /// Mesh formats to write (stl, amf, dae, obj). Defaults to all of them.
    #[arg(short, long = "format", value_delimiter = ',')]
    formats: Vec<MeshFormat>,

    /// Tessellation tolerance in model units; smaller is finer.
    #[arg(short, long, default_value_t = DEFAULT_TESSELLATION_TOLERANCE)]
    tolerance: f64,

    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    out_dir: PathBuf,

    /// meshlabserver executable used for AMF, DAE and filter scripts.
    #[arg(long, default_value = DEFAULT_MESHLAB_SERVER)]
    meshlabserver: PathBuf,

    /// Meshlab filter script producing `<part>_simple.stl`.
    #[arg(long)]
    simplify_script: Option<PathBuf>,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    simplify_iterations: u32,

    /// Meshlab filter script producing `<part>_hull.stl`.
    #[arg(long)]
    hull_script: Option<PathBuf>,

    /// Also write the run summary as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn export_options(&self) -> Result<ExportOptions> {
        let formats = if self.formats.is_empty() {
            FormatSet::all()
        } else {
            FormatSet::new(self.formats.iter().copied())
        };
        Ok(ExportOptions {
            out_dir: self.out_dir.clone(),
            formats,
            tolerance: Tolerance::new(self.tolerance)?,
        })
    }

    fn mesh_writer(&self) -> MeshWriter {
        let mut writer = MeshWriter::new(MeshlabServer::new(&self.meshlabserver));
        if let Some(script) = &self.simplify_script {
            writer = writer.with_simplify_script(script, self.simplify_iterations);
        }
        if let Some(script) = &self.hull_script {
            writer = writer.with_hull_script(script);
        }
        writer
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(usage_status(&err));
        }
    };

    let outcome = convert(&cli);
    if let Err(err) = &outcome {
        eprintln!("Error: {err:?}");
    }
    ExitCode::from(outcome_status(&outcome))
}

fn convert(cli: &Cli) -> Result<RunReport> {
    let options = cli.export_options()?;
    let writer = cli.mesh_writer();
    let report = run(&StepLoader, &writer, &cli.input, &options)
        .with_context(|| format!("conversion of {} aborted", cli.input.display()))?;

    print!("{report}");
    if let Some(path) = &cli.report {
        write_report(&report, path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(report)
}

/// `--help` and `--version` succeed; any other parse failure aborts.
fn usage_status(err: &clap::Error) -> u8 {
    if err.use_stderr() { ABORTED } else { SUCCESS }
}

fn outcome_status(outcome: &Result<RunReport>) -> u8 {
    match outcome {
        Ok(report) if report.is_success() => SUCCESS,
        Ok(_) => PARTIAL_FAILURE,
        Err(_) => ABORTED,
    }
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize run report")?;
    std::fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
