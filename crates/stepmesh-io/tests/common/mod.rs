#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::Path;
use truck_modeling::{Point3, Vector3, builder};
use truck_stepio::out;

/// Writes a single `width x height x depth` box solid as a STEP file.
pub fn write_box_step(path: &Path, width: f64, height: f64, depth: f64) -> Result<()> {
    let v = builder::vertex(Point3::new(0.0, 0.0, 0.0));
    let e = builder::tsweep(&v, Vector3::unit_x() * width);
    let f = builder::tsweep(&e, Vector3::unit_y() * height);
    let solid = builder::tsweep(&f, Vector3::unit_z() * depth);

    let compressed = solid.compress();
    let header = out::StepHeaderDescriptor {
        file_name: path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("box.step")
            .to_string(),
        organization_system: "stepmesh".to_string(),
        ..Default::default()
    };
    let step_string =
        out::CompleteStepDisplay::new(out::StepModel::from(&compressed), header).to_string();
    fs::write(path, step_string)?;
    Ok(())
}

/// A STEP file that parses but holds no geometry.
pub const EMPTY_STEP: &str = "ISO-10303-21;
HEADER;
FILE_DESCRIPTION((''),'2;1');
FILE_NAME('empty.step','2024-01-01T00:00:00',(''),(''),'','','');
FILE_SCHEMA(('AUTOMOTIVE_DESIGN'));
ENDSEC;
DATA;
#1=PRODUCT('EMPTY','Empty','',(#2));
#2=PRODUCT_CONTEXT('',#3,'mechanical');
#3=APPLICATION_CONTEXT('automotive design');
ENDSEC;
END-ISO-10303-21;
";

pub fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
