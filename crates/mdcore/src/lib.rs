pub mod markdown;
pub mod render;
pub mod sanitize;

pub use markdown::{is_converting, GfmConverter, MarkupConverter};
pub use render::{RenderError, Rendered, Renderer};
pub use sanitize::{AmmoniaSanitizer, MarkupSanitizer};

#[cfg(test)]
pub(crate) use sanitize::sanitize_html;

#[cfg(test)]
mod tests;
