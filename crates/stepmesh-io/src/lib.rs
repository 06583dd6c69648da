pub mod mesh;
pub mod meshlab;
mod names;
pub mod step;
pub mod writer;

pub use mesh::{triangulate_body, write_obj, write_stl};
pub use meshlab::{DEFAULT_MESHLAB_SERVER, MeshlabServer};
pub use step::{StepBody, StepLoader, import_step};
pub use writer::MeshWriter;
