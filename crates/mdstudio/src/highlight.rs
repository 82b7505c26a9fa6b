//! Syntax highlighting for fenced code blocks in the preview.

use std::sync::OnceLock;

use ratatui::style::{Color, Style};
use ratatui::text::Span;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style as SynStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

pub struct Highlighter {
    theme: Theme,
}

impl Highlighter {
    pub fn new(theme_name: &str) -> Self {
        let themes = &theme_set().themes;
        let theme = match themes.get(theme_name) {
            Some(theme) => theme.clone(),
            None => {
                log::warn!(
                    "Unknown code theme '{}', using {}",
                    theme_name,
                    DEFAULT_THEME
                );
                themes.get(DEFAULT_THEME).cloned().unwrap_or_default()
            }
        };
        Self { theme }
    }

    /// Syntax for a fence language such as `rust`, `js` or `Python`.
    pub fn find_syntax_for_language(&self, language: &str) -> Option<&'static SyntaxReference> {
        let syntaxes = syntax_set();
        syntaxes
            .find_syntax_by_token(language)
            .or_else(|| syntaxes.find_syntax_by_name(language))
    }

    /// Highlighted spans per code line, or `None` when the language is
    /// missing or unknown.
    pub fn highlight_code(
        &self,
        language: Option<&str>,
        code: &str,
    ) -> Option<Vec<Vec<Span<'static>>>> {
        let syntax = self.find_syntax_for_language(language?)?;
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let lines = LinesWithEndings::from(code)
            .map(|line| {
                let regions = highlighter
                    .highlight_line(line, syntax_set())
                    .unwrap_or_else(|e| {
                        log::debug!("Highlighting failed, keeping plain line: {}", e);
                        vec![(SynStyle::default(), line)]
                    });

                regions
                    .into_iter()
                    .filter_map(|(style, text)| {
                        let text = text.trim_end_matches(['\n', '\r']);
                        (!text.is_empty())
                            .then(|| Span::styled(text.to_string(), syn_style_to_ratatui(style)))
                    })
                    .collect()
            })
            .collect();
        Some(lines)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

// Foreground only, the pane keeps its own background
fn syn_style_to_ratatui(style: SynStyle) -> Style {
    let fg = style.foreground;
    Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(spans: &[Span<'static>]) -> String {
        spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_highlight_rust_produces_colored_spans() {
        let highlighter = Highlighter::default();
        let lines = highlighter
            .highlight_code(Some("rust"), "fn main() {\n    let x = 1;\n}\n")
            .unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(line_text(&lines[0]), "fn main() {");
        assert_eq!(line_text(&lines[1]), "    let x = 1;");
        assert!(lines
            .iter()
            .flatten()
            .all(|span| matches!(span.style.fg, Some(Color::Rgb(..)))));
        assert!(lines.iter().flatten().all(|span| span.style.bg.is_none()));
    }

    #[test]
    fn test_language_lookup_by_token_and_name() {
        let highlighter = Highlighter::default();
        assert!(highlighter.find_syntax_for_language("js").is_some());
        assert!(highlighter.find_syntax_for_language("Python").is_some());
        assert!(highlighter.find_syntax_for_language("no-such-lang").is_none());
    }

    #[test]
    fn test_unknown_or_missing_language_is_not_highlighted() {
        let highlighter = Highlighter::default();
        assert!(highlighter.highlight_code(Some("nope"), "text").is_none());
        assert!(highlighter.highlight_code(None, "text").is_none());
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let highlighter = Highlighter::new("no-such-theme");
        assert!(highlighter.highlight_code(Some("rust"), "fn f() {}").is_some());
    }
}
