use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, Mode, FORMAT_KEYS};
use crate::session::RESET_PROMPT;
use crate::status_manager::NoticeKind;

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Length(1), // Toolbar
            Constraint::Min(0),    // Editor and preview
            Constraint::Length(1), // Status line
        ])
        .split(f.size());

    draw_title_bar(f, app, chunks[0]);
    draw_toolbar(f, chunks[1]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    // The generation is read before drawing so the frame reports what it showed
    let generation = app.session.render_generation();
    draw_editor(f, app, panes[0]);
    draw_preview(f, app, panes[1]);
    draw_status_line(f, app, chunks[3]);

    if app.session.is_cheat_sheet_open() {
        draw_cheat_sheet(f, app, chunks[2]);
    }

    app.frame_drawn(generation);
}

fn draw_title_bar(f: &mut Frame, app: &App, area: Rect) {
    let storage = if app.session.store().is_persistent() {
        ""
    } else {
        " [not saved: storage unavailable]"
    };
    let title = format!("  Markdown Studio{}", storage);

    let title_bar = Paragraph::new(title)
        .style(Style::default().bg(Color::Blue).fg(Color::White))
        .alignment(Alignment::Left);

    f.render_widget(title_bar, area);
}

fn draw_toolbar(f: &mut Frame, area: Rect) {
    let key_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);

    let mut spans = Vec::new();
    for (key, command) in FORMAT_KEYS {
        spans.push(Span::styled(format!("M-{}", key), key_style));
        spans.push(Span::raw(format!(" {}  ", command.label())));
    }
    spans.push(Span::styled("F1", key_style));
    spans.push(Span::raw(" Help"));

    let toolbar = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    f.render_widget(toolbar, area);
}

fn draw_editor(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Markdown ");
    let inner = block.inner(area);
    f.render_widget(block, area);
    app.editor_area = inner;

    let gutter = if app.config.editor.line_numbers { 5 } else { 0 };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(gutter), Constraint::Min(0)])
        .split(inner);

    app.editor.set_viewport_height(inner.height as usize);
    let lines = app.editor.viewport_lines();
    let start_line = app.editor.viewport_offset();

    if gutter > 0 {
        let numbers: Vec<Line> = (0..lines.len())
            .map(|i| Line::from(format!("{:>4} ", start_line + i + 1)))
            .collect();
        f.render_widget(
            Paragraph::new(numbers).style(Style::default().fg(Color::DarkGray)),
            columns[0],
        );
    }

    let selection = app.editor.selection();
    let content: Vec<Line> = lines
        .iter()
        .enumerate()
        .map(|(i, text)| selected_line(app, start_line + i, text, selection))
        .collect();
    f.render_widget(
        Paragraph::new(content).style(Style::default().fg(Color::White)),
        columns[1],
    );

    let (cursor_line, cursor_col) = app.editor.cursor_line_col();
    if cursor_line >= start_line && cursor_line < start_line + lines.len() {
        let x = columns[1].x.saturating_add(cursor_col.min(u16::MAX as usize) as u16);
        let y = columns[1].y + (cursor_line - start_line) as u16;
        if x < columns[1].x + columns[1].width && y < columns[1].y + columns[1].height {
            f.set_cursor(x, y);
        }
    }
}

/// One editor line with the selected part highlighted.
fn selected_line(
    app: &App,
    line_index: usize,
    text: &str,
    selection: crate::selection::SelectionRange,
) -> Line<'static> {
    if selection.is_empty() {
        return Line::from(text.to_string());
    }

    let line_start = app.editor.line_start(line_index);
    let line_len = text.chars().count();
    let from = selection.start.saturating_sub(line_start).min(line_len);
    let to = selection.end.saturating_sub(line_start).min(line_len);
    if from == to {
        return Line::from(text.to_string());
    }

    let chars: Vec<char> = text.chars().collect();
    let before: String = chars[..from].iter().collect();
    let selected: String = chars[from..to].iter().collect();
    let after: String = chars[to..].iter().collect();
    Line::from(vec![
        Span::raw(before),
        Span::styled(selected, Style::default().bg(Color::DarkGray)),
        Span::raw(after),
    ])
}

fn draw_preview(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Preview ");
    let inner = block.inner(area);
    f.render_widget(block, area);
    app.preview_area = inner;
    app.set_preview_height(inner.height as usize);

    let offset = app.preview_offset().min(u16::MAX as usize) as u16;
    let lines = app.preview_lines().to_vec();
    f.render_widget(Paragraph::new(lines).scroll((offset, 0)), inner);
}

fn draw_status_line(f: &mut Frame, app: &App, area: Rect) {
    let line = match app.mode() {
        Mode::OpenPrompt => Line::from(vec![
            Span::styled("Open file: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.prompt().to_string()),
        ]),
        Mode::ConfirmReset => Line::from(Span::styled(
            format!("{} (y/n)", RESET_PROMPT),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Mode::Editing => match app.session.status().current() {
            Some(notice) => Line::from(Span::styled(
                notice.text.clone(),
                Style::default().fg(notice_color(notice.kind)),
            )),
            None => Line::from(Span::styled(
                "^S Save .md  ^E Export .doc  ^Y Copy HTML  ^O Open  ^R Reset  ^Q Quit",
                Style::default().fg(Color::Gray),
            )),
        },
    };

    f.render_widget(Paragraph::new(line), area);
}

fn notice_color(kind: NoticeKind) -> Color {
    match kind {
        NoticeKind::Info => Color::Cyan,
        NoticeKind::Success => Color::Green,
        NoticeKind::Warning => Color::Yellow,
        NoticeKind::Error => Color::Red,
    }
}

const RECENT_NOTICES: usize = 3;

fn draw_cheat_sheet(f: &mut Frame, app: &App, area: Rect) {
    let rows = [
        ("# Heading 1", "## Heading 2"),
        ("**bold**", "_italic_"),
        ("~~strikethrough~~", "`inline code`"),
        ("- list item", "1. numbered item"),
        ("> quote", "- [ ] task"),
        ("[link](https://…)", "![alt](image.png)"),
        ("```rust … ```", "| a | b | table"),
    ];

    let mut text = vec![
        Line::from(Span::styled(
            " Markdown cheat sheet",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    text.extend(
        rows.iter()
            .map(|(left, right)| Line::from(format!("  {:<22}{}", left, right))),
    );

    let history: Vec<_> = app.session.status().history().collect();
    if !history.is_empty() {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            " Recent messages",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        let skip = history.len().saturating_sub(RECENT_NOTICES);
        text.extend(history[skip..].iter().map(|notice| {
            Line::from(Span::styled(
                format!("  {}", notice.text),
                Style::default().fg(notice_color(notice.kind)),
            ))
        }));
    }

    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        " Press F1 or Esc to close",
        Style::default().add_modifier(Modifier::ITALIC),
    )));

    let popup = centered_rect(area, 56, text.len() as u16 + 2);
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .border_style(Style::default().fg(Color::Blue)),
        ),
        popup,
    );
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_store::{BufferStore, CURRENT_VERSION};
    use crate::clipboard::{ClipboardError, ClipboardSink};
    use crate::config::Config;
    use crate::export::DirectorySink;
    use crate::session::Session;
    use crate::storage::MemoryStore;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    struct NullClipboard;

    impl ClipboardSink for NullClipboard {
        fn set_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
            Ok(())
        }
    }

    fn create_test_app(content: &str) -> App {
        let store = BufferStore::open(Box::new(MemoryStore::new()), CURRENT_VERSION, content);
        let session = Session::new(
            store,
            Box::new(DirectorySink::new(std::env::temp_dir())),
            Box::new(NullClipboard),
        );
        App::new(Config::default(), session)
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_draw_basic() {
        let backend = TestBackend::new(100, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut app = create_test_app("# Welcome\n\nSome **bold** text");

        terminal.draw(|f| draw(f, &mut app)).unwrap();

        let screen = screen_text(&terminal);
        assert!(screen.contains("Markdown Studio"));
        assert!(screen.contains("# Welcome"));
        assert!(screen.contains("Some bold text"));
    }

    #[test]
    fn test_draw_records_generation() {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut app = create_test_app("hello world");

        app.session
            .on_format_command(
                crate::selection::FormatCommand::Bold,
                &crate::selection::SelectionRange::new(0, 5),
            )
            .unwrap();
        app.editor.set_content(app.session.buffer());
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        app.after_draw();

        assert!(!app.session.has_pending_selection());
        assert_eq!(app.editor.selected_text(), "hello");
    }

    #[test]
    fn test_draw_with_cheat_sheet() {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut app = create_test_app("");
        app.session.toggle_cheat_sheet();

        terminal.draw(|f| draw(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("Markdown cheat sheet"));
    }

    #[test]
    fn test_cheat_sheet_lists_recent_messages() {
        let backend = TestBackend::new(80, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut app = create_test_app("");
        for i in 0..5 {
            app.session.status_mut().info(format!("message {}", i));
        }
        app.session.status_mut().clear();
        app.session.toggle_cheat_sheet();

        terminal.draw(|f| draw(f, &mut app)).unwrap();
        let screen = screen_text(&terminal);
        assert!(screen.contains("Recent messages"));
        assert!(screen.contains("message 4"));
        assert!(screen.contains("message 2"));
        assert!(!screen.contains("message 1"));
    }

    #[test]
    fn test_draw_small_terminal() {
        // Should not panic even with tiny size
        let backend = TestBackend::new(5, 2);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut app = create_test_app("text");
        app.session.toggle_cheat_sheet();

        terminal.draw(|f| draw(f, &mut app)).unwrap();
    }

    #[tokio::test]
    async fn test_reset_prompt_is_shown() {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut app = create_test_app("");

        app.handle_key_event(crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::Char('r'),
            crossterm::event::KeyModifiers::CONTROL,
        ))
        .await
        .unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("Are you sure?"));
    }
}
