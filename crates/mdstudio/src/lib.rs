// Markdown Studio library exports

pub mod app;
pub mod buffer_store;
pub mod clipboard;
pub mod config;
pub mod default_document;
pub mod editor;
pub mod highlight;
pub mod export;
pub mod import;
pub mod preview;
pub mod scroll_sync;
pub mod selection;
pub mod session;
pub mod status_manager;
pub mod storage;
pub mod ui;

pub use app::{App, Mode};
pub use buffer_store::{BufferStore, CURRENT_VERSION};
pub use config::Config;
pub use editor::Editor;
pub use selection::{insert_around, FormatCommand, SelectionRange};
pub use session::{SelectionSource, Session};
