//! Message templates
//!
//! Compiles declarative template definitions once and renders them into
//! transport-ready messages, merging HTML and plain-text bodies and
//! assembling the attachment list.

pub mod compiler;
pub mod engine;
pub mod html2text;
pub mod renderer;
pub mod types;

pub use compiler::{compile, compile_strict, CompiledAttachment, CompiledTemplate};
pub use engine::{CompiledField, InterpolationEngine};
pub use html2text::html_to_text;
pub use renderer::TemplateRenderer;
pub use types::{AttachmentDescriptor, RenderedMessage, TemplateDefinition};
