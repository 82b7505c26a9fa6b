//! The session controller.
//!
//! Turns user intents into buffer store transitions. Re-rendering is wired
//! through a store subscription, so every path that mutates the buffer
//! refreshes the preview the same way.
//!
//! Caret restoration after a formatting command is a continuation of the
//! render pipeline: the controller parks the new selection together with the
//! render generation it belongs to, and only hands it out from
//! [`Session::frame_rendered`] once a frame showing that generation has been
//! drawn.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use mdcore::{Rendered, Renderer};

use crate::buffer_store::BufferStore;
use crate::clipboard::{ClipboardError, ClipboardSink};
use crate::export::{self, DocumentConverter, ExportError, SaveSink};
use crate::import::{self, ImportError};
use crate::scroll_sync::{Extents, Pane, ScrollSample, ScrollSynchronizer, SyncMode};
use crate::selection::{FormatCommand, SelectionError, SelectionRange};
use crate::status_manager::StatusManager;

pub const RESET_PROMPT: &str = "Are you sure? This will delete your current text.";

/// Anything that can report the live selection of the editing surface.
pub trait SelectionSource {
    fn selection(&self) -> SelectionRange;
}

impl SelectionSource for SelectionRange {
    fn selection(&self) -> SelectionRange {
        *self
    }
}

struct Preview {
    renderer: Renderer,
    rendered: Rendered,
    generation: u64,
}

impl Preview {
    fn refresh(&mut self, source: &str) {
        self.rendered = self.renderer.render(source);
        self.generation += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingSelection {
    selection: SelectionRange,
    generation: u64,
}

pub struct Session {
    store: BufferStore,
    preview: Rc<RefCell<Preview>>,
    scroll: ScrollSynchronizer,
    converter: Box<dyn DocumentConverter>,
    sink: Box<dyn SaveSink>,
    clipboard: Box<dyn ClipboardSink>,
    status: StatusManager,
    pending_selection: Option<PendingSelection>,
    preview_offset: f64,
    document_title: String,
    cheat_sheet_open: bool,
}

impl Session {
    pub fn new(
        mut store: BufferStore,
        sink: Box<dyn SaveSink>,
        clipboard: Box<dyn ClipboardSink>,
    ) -> Self {
        let renderer = Renderer::new();
        let rendered = renderer.render(store.buffer());
        let preview = Rc::new(RefCell::new(Preview {
            renderer,
            rendered,
            generation: 0,
        }));

        let listener = Rc::clone(&preview);
        store.subscribe(move |source| listener.borrow_mut().refresh(source));

        Self {
            store,
            preview,
            scroll: ScrollSynchronizer::default(),
            converter: Box::new(export::WordHtmlConverter),
            sink,
            clipboard,
            status: StatusManager::new(),
            pending_selection: None,
            preview_offset: 0.0,
            document_title: "Markdown Studio".to_string(),
            cheat_sheet_open: false,
        }
    }

    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.scroll = ScrollSynchronizer::new(mode);
        self
    }

    pub fn with_converter(mut self, converter: Box<dyn DocumentConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_document_title(mut self, title: impl Into<String>) -> Self {
        self.document_title = title.into();
        self
    }

    pub fn buffer(&self) -> &str {
        self.store.buffer()
    }

    pub fn store(&self) -> &BufferStore {
        &self.store
    }

    /// Sanitized markup of the current buffer, safe to display.
    pub fn safe_markup(&self) -> String {
        self.preview.borrow().rendered.safe.clone()
    }

    /// Increases every time the buffer is re-rendered.
    pub fn render_generation(&self) -> u64 {
        self.preview.borrow().generation
    }

    pub fn preview_offset(&self) -> f64 {
        self.preview_offset
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.scroll.mode()
    }

    pub fn status(&self) -> &StatusManager {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusManager {
        &mut self.status
    }

    pub fn on_edit(&mut self, text: impl Into<String>) {
        self.store.update(text);
    }

    /// Wrap the surface's current selection with the command's markers.
    ///
    /// The returned selection is not applied yet; it becomes available from
    /// [`Session::frame_rendered`] once the new buffer has been drawn.
    pub fn on_format_command(
        &mut self,
        command: FormatCommand,
        surface: &dyn SelectionSource,
    ) -> Result<(), SelectionError> {
        let insertion = match command.apply(self.store.buffer(), surface.selection()) {
            Ok(insertion) => insertion,
            Err(e) => {
                self.status.warning(format!("{} ignored: {}", command.label(), e));
                return Err(e);
            }
        };

        self.store.update(insertion.new_buffer);
        self.pending_selection = Some(PendingSelection {
            selection: insertion.new_selection,
            generation: self.render_generation(),
        });
        Ok(())
    }

    /// Report that a frame showing render generation `drawn` is on screen.
    /// Returns the selection to restore, at most once per formatting command.
    pub fn frame_rendered(&mut self, drawn: u64) -> Option<SelectionRange> {
        match self.pending_selection {
            Some(pending) if drawn >= pending.generation => {
                self.pending_selection = None;
                Some(pending.selection)
            }
            _ => None,
        }
    }

    pub fn has_pending_selection(&self) -> bool {
        self.pending_selection.is_some()
    }

    /// Feed a scroll event from `source`. Returns the offset to apply to the
    /// other pane, if this event drives it.
    pub fn on_scroll(&mut self, source: Pane, sample: ScrollSample, target: Extents) -> Option<f64> {
        if source == Pane::Preview {
            self.preview_offset = sample.scroll_offset;
        }
        let offset = self.scroll.on_scroll(source, &sample, &target)?;
        if source == Pane::Editor {
            self.preview_offset = offset;
        }
        Some(offset)
    }

    /// Restore the default document. `confirm` is asked first; returns
    /// whether the reset happened.
    pub fn on_reset(&mut self, confirm: impl FnOnce(&str) -> bool) -> bool {
        if !confirm(RESET_PROMPT) {
            log::debug!("Reset cancelled");
            return false;
        }
        let fallback = self.store.fallback().to_string();
        self.store.update(fallback);
        self.pending_selection = None;
        self.status.info("Editor reset to the default document");
        true
    }

    pub fn on_load_file(
        &mut self,
        bytes: &[u8],
        name: &str,
        content_type: Option<&str>,
    ) -> Result<(), ImportError> {
        match import::decode(name, content_type, bytes) {
            Ok(text) => {
                self.store.update(text);
                self.pending_selection = None;
                self.status.success(format!("Loaded {}", name));
                Ok(())
            }
            Err(e) => {
                self.status.warning(e.to_string());
                Err(e)
            }
        }
    }

    pub fn on_export_markdown(&mut self) -> Result<PathBuf, ExportError> {
        let artifact = export::markdown_artifact(self.store.buffer());
        let result = self.sink.save(&artifact);
        self.finish_export(result)
    }

    pub fn on_export_document(&mut self) -> Result<PathBuf, ExportError> {
        let markup = self.unsafe_markup();
        let result = export::document_artifact(&self.document_title, &markup, self.converter.as_ref())
            .and_then(|artifact| self.sink.save(&artifact));
        self.finish_export(result)
    }

    fn finish_export(&mut self, result: Result<PathBuf, ExportError>) -> Result<PathBuf, ExportError> {
        match &result {
            Ok(path) => self.status.success(format!("Saved {}", path.display())),
            Err(e) => self.status.error(format!("Export failed: {}", e)),
        }
        result
    }

    /// Copy the full-fidelity (unsanitized) markup to the clipboard.
    pub fn on_copy_rendered_markup(&mut self) -> Result<(), ClipboardError> {
        let markup = self.unsafe_markup();
        let result = self.clipboard.set_text(&markup);
        match &result {
            Ok(()) => self.status.success("HTML copied to clipboard!"),
            Err(e) => self.status.error(format!("Copy failed: {}", e)),
        }
        result
    }

    fn unsafe_markup(&self) -> String {
        self.preview.borrow().rendered.unsafe_markup.clone()
    }

    pub fn toggle_cheat_sheet(&mut self) {
        self.cheat_sheet_open = !self.cheat_sheet_open;
    }

    pub fn close_cheat_sheet(&mut self) {
        self.cheat_sheet_open = false;
    }

    pub fn is_cheat_sheet_open(&self) -> bool {
        self.cheat_sheet_open
    }
}
