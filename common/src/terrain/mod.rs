pub mod block;
pub mod template;

// Reexports
pub use self::{
    block::{Block, BlockKind, Fluid},
    template::{Marker, Template, TemplateError, TemplateManager, TemplateSource},
};
