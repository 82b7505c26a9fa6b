//! System clipboard access for copying rendered markup.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ClipboardError {
    #[error("Failed to access clipboard: {0}")]
    Access(String),

    #[error("Failed to write to clipboard: {0}")]
    Write(String),
}

pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// arboard-backed clipboard.
///
/// The handle is opened on first use and kept for the session: on X11 the
/// copied text is only served while a handle is alive.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Result<&mut arboard::Clipboard, ClipboardError> {
        if self.handle.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| ClipboardError::Access(e.to_string()))?;
            self.handle = Some(clipboard);
        }
        self.handle
            .as_mut()
            .ok_or_else(|| ClipboardError::Access("clipboard handle missing".to_string()))
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let result = self
            .handle()?
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Write(e.to_string()));

        // A failed write often means the handle went stale; retry fresh next time
        if result.is_err() {
            self.handle = None;
        }
        result
    }
}
