use comrak::{markdown_to_html, Options};
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

use crate::render::RenderError;

thread_local! {
    static CONVERTING: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside a markdown conversion.
///
/// A panic raised while this is true is caught by the converter and turned
/// into a [`RenderError`], so process-wide panic hooks should not treat it
/// as fatal.
pub fn is_converting() -> bool {
    CONVERTING.with(Cell::get)
}

/// Marks the thread as converting until dropped, including during unwinding.
struct ConvertingGuard {
    previous: bool,
}

impl ConvertingGuard {
    fn enter() -> Self {
        Self {
            previous: CONVERTING.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for ConvertingGuard {
    fn drop(&mut self) {
        CONVERTING.with(|flag| flag.set(self.previous));
    }
}

/// Run `convert` with panics turned into [`RenderError::Panicked`].
fn catch_converter_panic(convert: impl FnOnce() -> String) -> Result<String, RenderError> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        let _guard = ConvertingGuard::enter();
        convert()
    }))
    .map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        RenderError::Panicked(reason)
    })
}

/// Converts markdown source into (unsanitized) markup.
pub trait MarkupConverter {
    fn convert(&self, source: &str) -> Result<String, RenderError>;
}

/// GitHub-flavoured converter backed by comrak, with significant line breaks.
pub struct GfmConverter {
    options: Options<'static>,
}

impl GfmConverter {
    pub fn new() -> Self {
        Self {
            options: create_comrak_options(),
        }
    }
}

impl Default for GfmConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupConverter for GfmConverter {
    fn convert(&self, source: &str) -> Result<String, RenderError> {
        // comrak has no error channel, a panic is the only failure mode
        catch_converter_panic(|| markdown_to_html(source, &self.options))
    }
}

fn create_comrak_options() -> Options<'static> {
    let mut opt = Options::default();

    // GitHub-flavoured extensions
    opt.extension.strikethrough = true;
    opt.extension.table = true;
    opt.extension.autolink = true;
    opt.extension.tasklist = true;

    // A single newline inside a paragraph is a line break
    opt.render.hardbreaks = true;

    // Raw HTML is kept here; the sanitizer owns safety for display
    opt.render.unsafe_ = true;
    opt.render.escape = false;

    opt
}
