pub mod constants;
pub mod io;
mod job;
mod operation;
mod options;
mod planner;
mod raster;
pub mod transform;
mod types;

pub use io::{SourceDocument, load_multiple_pdfs, load_pdf, load_pdf_bytes, save_outputs, save_pdf};
pub use job::*;
pub use operation::Operation;
pub use options::*;
pub use planner::{PagePlan, PagePlanner};
pub use transform::{apply_transform, apply_transform_async};
pub use types::*;
