//! The sanitizing renderer: one conversion step, two explicit outputs.
//!
//! `render_safe` is what gets displayed. `render_unsafe` is the same
//! conversion without sanitization, used for the clipboard and rich export.

use thiserror::Error;

use crate::markdown::{GfmConverter, MarkupConverter};
use crate::sanitize::{AmmoniaSanitizer, MarkupSanitizer};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown converter panicked: {0}")]
    Panicked(String),

    #[error("markdown converter stopped early: {reason}")]
    Partial { markup: String, reason: String },
}

impl RenderError {
    /// Best-effort markup salvaged from a failed conversion.
    pub fn into_partial(self) -> String {
        match self {
            RenderError::Panicked(_) => String::new(),
            RenderError::Partial { markup, .. } => markup,
        }
    }
}

/// Both outputs of a single conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub safe: String,
    pub unsafe_markup: String,
}

pub struct Renderer<C = GfmConverter, S = AmmoniaSanitizer> {
    converter: C,
    sanitizer: S,
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_parts(GfmConverter::new(), AmmoniaSanitizer::new())
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: MarkupConverter, S: MarkupSanitizer> Renderer<C, S> {
    pub fn with_parts(converter: C, sanitizer: S) -> Self {
        Self {
            converter,
            sanitizer,
        }
    }

    fn convert(&self, source: &str) -> String {
        match self.converter.convert(source) {
            Ok(markup) => markup,
            Err(e) => {
                log::error!("Markdown conversion failed, rendering best effort: {}", e);
                e.into_partial()
            }
        }
    }

    /// Sanitized markup for display.
    pub fn render_safe(&self, source: &str) -> String {
        self.sanitizer.sanitize(&self.convert(source))
    }

    /// Unsanitized, full-fidelity markup. Never display this directly.
    pub fn render_unsafe(&self, source: &str) -> String {
        self.convert(source)
    }

    pub fn render(&self, source: &str) -> Rendered {
        let unsafe_markup = self.convert(source);
        Rendered {
            safe: self.sanitizer.sanitize(&unsafe_markup),
            unsafe_markup,
        }
    }

    pub fn sanitize(&self, markup: &str) -> String {
        self.sanitizer.sanitize(markup)
    }
}
