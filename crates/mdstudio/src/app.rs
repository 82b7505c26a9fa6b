use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{layout::Rect, text::Line};
use std::path::Path;

use crate::config::{Config, PreviewStyle};
use crate::editor::Editor;
use crate::highlight::Highlighter;
use crate::import;
use crate::preview;
use crate::scroll_sync::{Extents, Pane, ScrollSample};
use crate::selection::{FormatCommand, SelectionRange};
use crate::session::Session;

const MOUSE_SCROLL_LINES: isize = 3;

/// Alt+key bindings for the formatting commands.
pub const FORMAT_KEYS: [(char, FormatCommand); 9] = [
    ('b', FormatCommand::Bold),
    ('i', FormatCommand::Italic),
    ('s', FormatCommand::Strikethrough),
    ('1', FormatCommand::Heading1),
    ('2', FormatCommand::Heading2),
    ('c', FormatCommand::InlineCode),
    ('k', FormatCommand::CodeBlock),
    ('l', FormatCommand::List),
    ('q', FormatCommand::Quote),
];

pub fn format_command_for(key: char) -> Option<FormatCommand> {
    FORMAT_KEYS
        .iter()
        .find(|(bound, _)| *bound == key.to_ascii_lowercase())
        .map(|(_, command)| *command)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Editing,
    OpenPrompt,
    ConfirmReset,
}

pub struct App {
    pub editor: Editor,
    pub session: Session,
    pub config: Config,
    highlighter: Highlighter,
    mode: Mode,
    prompt: String,
    preview_cache: Option<(u64, Vec<Line<'static>>)>,
    preview_height: usize,
    pub(crate) editor_area: Rect,
    pub(crate) preview_area: Rect,
    last_drawn: Option<u64>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, session: Session) -> Self {
        let mut editor = Editor::new();
        editor.set_tab_size(config.editor.tab_size);
        editor.set_content(session.buffer());
        let highlighter = Highlighter::new(&config.ui.code_theme);

        Self {
            editor,
            session,
            config,
            highlighter,
            mode: Mode::Editing,
            prompt: String::new(),
            preview_cache: None,
            preview_height: 1,
            editor_area: Rect::default(),
            preview_area: Rect::default(),
            last_drawn: None,
            should_quit: false,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Preview lines for the current render generation.
    pub fn preview_lines(&mut self) -> &[Line<'static>] {
        let generation = self.session.render_generation();
        let stale = self
            .preview_cache
            .as_ref()
            .map_or(true, |(cached, _)| *cached != generation);

        if stale {
            let markup = self.session.safe_markup();
            let lines = match self.config.ui.preview {
                PreviewStyle::Rendered => preview::markup_to_lines(&markup, &self.highlighter),
                PreviewStyle::Markup => preview::raw_lines(&markup),
            };
            self.preview_cache = Some((generation, lines));
        }

        self.preview_cache
            .as_ref()
            .map(|(_, lines)| lines.as_slice())
            .unwrap_or(&[])
    }

    pub fn preview_offset(&self) -> usize {
        self.session.preview_offset().max(0.0).round() as usize
    }

    pub fn set_preview_height(&mut self, height: usize) {
        self.preview_height = height.max(1);
    }

    fn preview_extents(&mut self) -> Extents {
        Extents {
            content_extent: self.preview_lines().len() as f64,
            viewport_extent: self.preview_height as f64,
        }
    }

    /// Record which render generation the last frame showed.
    pub fn frame_drawn(&mut self, generation: u64) {
        self.last_drawn = Some(generation);
    }

    /// Apply work that has to wait until the new render is on screen.
    pub fn after_draw(&mut self) {
        let Some(drawn) = self.last_drawn else {
            return;
        };
        if let Some(selection) = self.session.frame_rendered(drawn) {
            self.editor.set_selection(selection);
            self.sync_preview_from_editor();
        }
    }

    pub async fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
        {
            log::info!("Exit requested");
            self.quit();
            return Ok(());
        }

        match self.mode {
            Mode::OpenPrompt => self.handle_prompt_key(key).await,
            Mode::ConfirmReset => {
                self.handle_confirm_key(key);
                Ok(())
            }
            Mode::Editing => {
                self.handle_editing_key(key);
                Ok(())
            }
        }
    }

    fn handle_editing_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::F(1) {
            self.session.toggle_cheat_sheet();
            return;
        }
        if key.code == KeyCode::Esc {
            self.session.close_cheat_sheet();
            self.editor.clear_selection();
            return;
        }

        if key.modifiers.contains(KeyModifiers::ALT) {
            if let KeyCode::Char(c) = key.code {
                if let Some(command) = format_command_for(c) {
                    self.apply_format(command);
                }
            }
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => {
                    let _ = self.session.on_export_markdown();
                }
                KeyCode::Char('e') => {
                    let _ = self.session.on_export_document();
                }
                KeyCode::Char('y') => {
                    let _ = self.session.on_copy_rendered_markup();
                }
                KeyCode::Char('r') => self.mode = Mode::ConfirmReset,
                KeyCode::Char('o') => {
                    self.prompt.clear();
                    self.mode = Mode::OpenPrompt;
                }
                _ => {}
            }
            return;
        }

        let extend = key.modifiers.contains(KeyModifiers::SHIFT);
        let edited = match key.code {
            KeyCode::Char(c) => {
                self.editor.insert_char(c);
                true
            }
            KeyCode::Enter => {
                self.editor.insert_newline();
                true
            }
            KeyCode::Tab => {
                self.editor.insert_tab();
                true
            }
            KeyCode::Backspace => {
                self.editor.delete_char_backward();
                true
            }
            KeyCode::Delete => {
                self.editor.delete_char_forward();
                true
            }

            KeyCode::Left => {
                self.editor.move_cursor_left(extend);
                false
            }
            KeyCode::Right => {
                self.editor.move_cursor_right(extend);
                false
            }
            KeyCode::Up => {
                self.editor.move_cursor_up(extend);
                false
            }
            KeyCode::Down => {
                self.editor.move_cursor_down(extend);
                false
            }
            KeyCode::Home => {
                self.editor.move_to_line_start(extend);
                false
            }
            KeyCode::End => {
                self.editor.move_to_line_end(extend);
                false
            }
            KeyCode::PageUp => {
                self.editor.page_up(extend);
                false
            }
            KeyCode::PageDown => {
                self.editor.page_down(extend);
                false
            }
            _ => return,
        };

        if edited {
            self.session.on_edit(self.editor.content());
        }
        self.sync_preview_from_editor();
    }

    async fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.prompt.clear();
                self.mode = Mode::Editing;
            }
            KeyCode::Enter => {
                let path = std::mem::take(&mut self.prompt);
                self.mode = Mode::Editing;
                if !path.trim().is_empty() {
                    self.open_path(Path::new(path.trim())).await?;
                }
            }
            KeyCode::Backspace => {
                self.prompt.pop();
            }
            KeyCode::Char(c) => self.prompt.push(c),
            _ => {}
        }
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
        self.mode = Mode::Editing;
        if self.session.on_reset(|_| confirmed) {
            self.reload_editor();
        }
    }

    pub fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        let delta = match mouse.kind {
            MouseEventKind::ScrollUp => -MOUSE_SCROLL_LINES,
            MouseEventKind::ScrollDown => MOUSE_SCROLL_LINES,
            _ => return,
        };

        let over_preview = mouse.column >= self.preview_area.x
            && mouse.column < self.preview_area.x + self.preview_area.width
            && mouse.row >= self.preview_area.y
            && mouse.row < self.preview_area.y + self.preview_area.height;

        if over_preview {
            self.scroll_preview(delta);
        } else {
            self.editor.scroll_by(delta);
            self.sync_preview_from_editor();
        }
    }

    /// Read a file through the import gate into the buffer.
    pub async fn open_path(&mut self, path: &Path) -> Result<()> {
        match import::read_file(path).await {
            Ok(file) => {
                let loaded = self
                    .session
                    .on_load_file(&file.bytes, &file.name, file.content_type.as_deref())
                    .is_ok();
                if loaded {
                    self.reload_editor();
                }
            }
            Err(e) => self.session.status_mut().error(e.to_string()),
        }
        Ok(())
    }

    fn apply_format(&mut self, command: FormatCommand) {
        if self.session.on_format_command(command, &self.editor).is_ok() {
            let buffer = self.session.buffer().to_string();
            self.editor.set_content(&buffer);
            self.sync_preview_from_editor();
        }
    }

    fn reload_editor(&mut self) {
        let buffer = self.session.buffer().to_string();
        self.editor.set_content(&buffer);
        self.editor.set_selection(SelectionRange::caret(0));
        self.sync_preview_from_editor();
    }

    /// Drive the preview from the editor's scroll position.
    pub fn sync_preview_from_editor(&mut self) {
        let target = self.preview_extents();
        self.session
            .on_scroll(Pane::Editor, self.editor.scroll_sample(), target);
    }

    fn scroll_preview(&mut self, delta: isize) {
        let extents = self.preview_extents();
        let max_offset = (extents.content_extent - extents.viewport_extent).max(0.0);
        let offset = (self.preview_offset() as f64 + delta as f64).clamp(0.0, max_offset);

        let sample = ScrollSample::new(offset, extents.content_extent, extents.viewport_extent);
        if let Some(editor_offset) = self
            .session
            .on_scroll(Pane::Preview, sample, self.editor.extents())
        {
            self.editor.set_viewport_offset(editor_offset.round() as usize);
        }
    }
}
