use anyhow::Result;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use stepmesh_base::{
    ExportError, FormatSet, LoadError, MeshFormat, TessellationError, Tolerance,
};
use stepmesh_pipeline::{
    ExportOptions, FailureStage, GeometryLoader, MeshExporter, PipelineError, RawPart, run,
};

#[derive(Clone)]
struct FakeSolid {
    faces: usize,
    degenerate: bool,
}

struct FakeLoader {
    bodies: Vec<(Option<&'static str>, FakeSolid)>,
}

impl FakeLoader {
    fn new(bodies: Vec<(Option<&'static str>, FakeSolid)>) -> Self {
        Self { bodies }
    }
}

impl GeometryLoader for FakeLoader {
    type Geometry = FakeSolid;
    type Mesh = String;

    fn load(&self, path: &Path) -> Result<Vec<RawPart<FakeSolid>>, LoadError> {
        if !path.ends_with("model.step") {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        Ok(self
            .bodies
            .iter()
            .map(|(label, solid)| RawPart::new(label.map(str::to_string), solid.clone()))
            .collect())
    }

    fn tessellate(
        &self,
        solid: &FakeSolid,
        tolerance: Tolerance,
    ) -> Result<String, TessellationError> {
        if solid.degenerate {
            return Err(TessellationError::FailedFaces {
                failed: solid.faces,
                total: solid.faces,
            });
        }
        Ok(format!("faces={} tol={}", solid.faces, tolerance.get()))
    }
}

#[derive(Default)]
struct FakeExporter {
    unavailable: Vec<MeshFormat>,
    simplify: bool,
    writes: RefCell<Vec<PathBuf>>,
}

impl MeshExporter<String> for FakeExporter {
    fn write(&self, mesh: &String, format: MeshFormat, path: &Path) -> Result<(), ExportError> {
        if self.unavailable.contains(&format) {
            return Err(ExportError::Unsupported(format));
        }
        fs::write(path, format!("{format}:{mesh}")).map_err(|e| ExportError::io(path, e))?;
        self.writes.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn derived_suffixes(&self) -> Vec<&'static str> {
        if self.simplify {
            vec!["_simple"]
        } else {
            Vec::new()
        }
    }

    fn derive(
        &self,
        name: &str,
        mesh: &String,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExportError> {
        if !self.simplify {
            return Ok(Vec::new());
        }
        let path = out_dir.join(format!("{name}_simple.stl"));
        fs::write(&path, format!("simple:{mesh}")).map_err(|e| ExportError::io(&path, e))?;
        Ok(vec![path])
    }
}

fn solid(faces: usize) -> FakeSolid {
    FakeSolid {
        faces,
        degenerate: false,
    }
}

fn options(out_dir: &Path, formats: &[MeshFormat]) -> ExportOptions {
    ExportOptions {
        out_dir: out_dir.to_path_buf(),
        formats: FormatSet::new(formats.iter().copied()),
        tolerance: Tolerance::default(),
    }
}

fn files_in(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[test]
fn single_box_exports_stl() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out_dir = dir.path().join("meshes");
    let loader = FakeLoader::new(vec![(Some("Box1"), solid(6))]);
    let exporter = FakeExporter::default();

    let report = run(
        &loader,
        &exporter,
        Path::new("model.step"),
        &options(&out_dir, &[MeshFormat::Stl]),
    )?;

    assert!(report.is_success());
    assert_eq!(files_in(&out_dir)?, vec!["Box1.stl"]);
    assert_eq!(report.succeeded[0].outputs, vec![out_dir.join("Box1.stl")]);
    Ok(())
}

#[test]
fn every_part_gets_one_file_per_format() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let loader = FakeLoader::new(vec![
        (Some("Link"), solid(4)),
        (None, solid(8)),
        (Some("Link"), solid(12)),
    ]);
    let exporter = FakeExporter::default();

    let report = run(
        &loader,
        &exporter,
        Path::new("model.step"),
        &options(dir.path(), &[MeshFormat::Stl, MeshFormat::Obj]),
    )?;

    assert!(report.is_success());
    assert_eq!(report.part_count(), 3);
    assert_eq!(
        files_in(dir.path())?,
        vec![
            "Link.obj",
            "Link.stl",
            "Link_2.obj",
            "Link_2.stl",
            "Part2.obj",
            "Part2.stl"
        ]
    );
    Ok(())
}

#[test]
fn derived_meshes_never_replace_another_part() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let loader = FakeLoader::new(vec![(Some("A_simple"), solid(4)), (Some("A"), solid(8))]);
    let exporter = FakeExporter {
        simplify: true,
        ..FakeExporter::default()
    };

    let report = run(
        &loader,
        &exporter,
        Path::new("model.step"),
        &options(dir.path(), &[MeshFormat::Stl]),
    )?;

    assert!(report.is_success());
    assert_eq!(
        files_in(dir.path())?,
        vec!["A_2.stl", "A_2_simple.stl", "A_simple.stl", "A_simple_simple.stl"]
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("A_simple.stl"))?,
        "stl:faces=4 tol=0.5"
    );
    Ok(())
}

#[test]
fn failed_tessellation_does_not_stop_other_parts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let loader = FakeLoader::new(vec![
        (Some("A"), solid(6)),
        (
            Some("B"),
            FakeSolid {
                faces: 3,
                degenerate: true,
            },
        ),
        (Some("C"), solid(6)),
    ]);
    let exporter = FakeExporter::default();

    let report = run(
        &loader,
        &exporter,
        Path::new("model.step"),
        &options(dir.path(), &[MeshFormat::Stl]),
    )?;

    assert!(!report.is_success());
    assert_eq!(files_in(dir.path())?, vec!["A.stl", "C.stl"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "B");
    assert_eq!(report.failed[0].causes[0].stage, FailureStage::Tessellation);
    assert!(report.to_string().contains("failed  B [tessellation]"));
    Ok(())
}

#[test]
fn unavailable_format_fails_part_but_keeps_other_formats() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let loader = FakeLoader::new(vec![(Some("Gripper"), solid(6))]);
    let exporter = FakeExporter {
        unavailable: vec![MeshFormat::Dae],
        ..FakeExporter::default()
    };

    let report = run(
        &loader,
        &exporter,
        Path::new("model.step"),
        &options(dir.path(), &[MeshFormat::Stl, MeshFormat::Dae, MeshFormat::Obj]),
    )?;

    assert_eq!(files_in(dir.path())?, vec!["Gripper.obj", "Gripper.stl"]);
    let failure = &report.failed[0];
    assert_eq!(failure.outputs.len(), 2);
    assert_eq!(failure.causes.len(), 1);
    assert_eq!(failure.causes[0].format, Some(MeshFormat::Dae));
    Ok(())
}

#[test]
fn empty_document_is_not_an_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out_dir = dir.path().join("meshes");
    let loader = FakeLoader::new(Vec::new());
    let exporter = FakeExporter::default();

    let report = run(
        &loader,
        &exporter,
        Path::new("model.step"),
        &options(&out_dir, &MeshFormat::ALL),
    )?;

    assert!(report.is_success());
    assert_eq!(report.part_count(), 0);
    assert!(out_dir.is_dir());
    assert!(files_in(&out_dir)?.is_empty());
    Ok(())
}

#[test]
fn rerun_overwrites_with_identical_bytes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let loader = FakeLoader::new(vec![(Some("Base"), solid(6))]);
    let exporter = FakeExporter::default();
    let options = options(dir.path(), &[MeshFormat::Stl]);

    run(&loader, &exporter, Path::new("model.step"), &options)?;
    let first = fs::read(dir.path().join("Base.stl"))?;
    run(&loader, &exporter, Path::new("model.step"), &options)?;
    let second = fs::read(dir.path().join("Base.stl"))?;

    assert_eq!(first, second);
    assert_eq!(exporter.writes.borrow().len(), 2);
    Ok(())
}

#[test]
fn load_failure_aborts_the_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let loader = FakeLoader::new(vec![(Some("A"), solid(6))]);
    let exporter = FakeExporter::default();

    let result = run(
        &loader,
        &exporter,
        Path::new("missing.step"),
        &options(dir.path(), &[MeshFormat::Stl]),
    );

    assert!(matches!(result, Err(PipelineError::Load(LoadError::NotFound(_)))));
    assert!(exporter.writes.borrow().is_empty());
    Ok(())
}

#[test]
fn unusable_output_directory_aborts_the_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("meshes");
    fs::write(&blocker, b"not a directory")?;
    let loader = FakeLoader::new(vec![(Some("A"), solid(6))]);
    let exporter = FakeExporter::default();

    let result = run(
        &loader,
        &exporter,
        Path::new("model.step"),
        &options(&blocker.join("nested"), &[MeshFormat::Stl]),
    );

    assert!(matches!(result, Err(PipelineError::CreateOutputDir { .. })));
    Ok(())
}

#[test]
fn report_serializes_failures_by_stage() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let loader = FakeLoader::new(vec![(
        Some("Wrist"),
        FakeSolid {
            faces: 2,
            degenerate: true,
        },
    )]);
    let exporter = FakeExporter::default();

    let report = run(
        &loader,
        &exporter,
        Path::new("model.step"),
        &options(dir.path(), &[MeshFormat::Obj]),
    )?;
    let json = serde_json::to_value(&report)?;

    assert_eq!(json["succeeded"], serde_json::json!([]));
    assert_eq!(json["failed"][0]["name"], "Wrist");
    assert_eq!(json["failed"][0]["causes"][0]["stage"], "tessellation");
    assert!(json["failed"][0]["causes"][0].get("format").is_none());
    Ok(())
}
