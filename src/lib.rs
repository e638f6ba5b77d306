pub mod archive;
pub mod detect;
pub mod error;
pub mod ooo;
pub mod sanitize;
pub mod stylesheet;
pub mod translation;
pub mod viewer;

pub use error::{Error, Result, TransformError};
pub use ooo::{Config, OooViewer};
pub use viewer::{MimePart, RenderOutput, RenderedPart, Viewer};
