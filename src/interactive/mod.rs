//! Interactive preview of source and generated output

mod viewer;

pub use viewer::{PreviewConfig, PreviewWindow};
