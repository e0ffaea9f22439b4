//! Report generation: a static template bound to a point-in-time record
//! snapshot, rendered to deterministic PDF bytes.

mod pdf;
pub mod renderer;
pub mod template;

pub use renderer::{render, RenderError};
pub use template::TemplateError;
