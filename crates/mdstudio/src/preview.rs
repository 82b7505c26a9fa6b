//! Terminal rendering of sanitized markup for the preview pane.
//!
//! The input is always the sanitizer's output, so the tag set is small and
//! well formed: text never holds a raw `<`, and attribute values are always
//! quoted but may hold a raw `>`. Unknown tags are skipped and their text kept.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::highlight::Highlighter;

const RULE_WIDTH: usize = 24;

/// Styled lines for the `Rendered` preview style.
pub fn markup_to_lines(markup: &str, highlighter: &Highlighter) -> Vec<Line<'static>> {
    let mut writer = LineWriter::new(highlighter);
    let mut rest = markup;

    while !rest.is_empty() {
        match rest.find('<') {
            Some(0) => match tag_end(rest) {
                Some(end) => {
                    if let Some(tag) = Tag::parse(&rest[1..end]) {
                        writer.tag(&tag);
                    }
                    rest = &rest[end + 1..];
                }
                None => {
                    writer.text(rest);
                    rest = "";
                }
            },
            Some(start) => {
                writer.text(&rest[..start]);
                rest = &rest[start..];
            }
            None => {
                writer.text(rest);
                rest = "";
            }
        }
    }

    writer.finish()
}

/// Unstyled lines for the `Markup` preview style.
pub fn raw_lines(markup: &str) -> Vec<Line<'static>> {
    markup.lines().map(|line| Line::from(line.to_string())).collect()
}

/// Byte index of the `>` closing the tag that starts `markup`, skipping over
/// quoted attribute values.
fn tag_end(markup: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in markup.char_indices().skip(1) {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(i),
            None => {}
        }
    }
    None
}

struct Tag {
    name: String,
    closing: bool,
    attributes: Vec<(String, String)>,
}

impl Tag {
    /// Parse the text between `<` and `>`. Comments and doctypes yield `None`.
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.starts_with('!') || raw.starts_with('?') {
            return None;
        }
        let (closing, body) = match raw.strip_prefix('/') {
            Some(body) => (true, body),
            None => (false, raw),
        };
        let name_end = body
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(body.len());

        Some(Self {
            name: body[..name_end].to_ascii_lowercase(),
            closing,
            attributes: parse_attributes(&body[name_end..]),
        })
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Attributes with entity-decoded values. Names without a value map to "".
fn parse_attributes(mut rest: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = match rest.strip_prefix('=') {
            Some(assigned) => {
                let assigned = assigned.trim_start();
                match assigned.chars().next() {
                    Some(quote @ ('"' | '\'')) => {
                        let inner = &assigned[1..];
                        let end = inner.find(quote).unwrap_or(inner.len());
                        rest = inner.get(end + 1..).unwrap_or("");
                        decode_entities(&inner[..end])
                    }
                    _ => {
                        let end = assigned
                            .find(char::is_whitespace)
                            .unwrap_or(assigned.len());
                        rest = &assigned[end..];
                        decode_entities(&assigned[..end])
                    }
                }
            }
            None => String::new(),
        };

        if !name.is_empty() {
            attributes.push((name, value));
        }
    }

    attributes
}

/// Text of a `<pre>` block collected until the block closes.
#[derive(Default)]
struct CodeBlock {
    language: Option<String>,
    text: String,
}

struct LineWriter<'h> {
    highlighter: &'h Highlighter,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    // Whether `current` holds anything beyond prefixes and list markers
    has_content: bool,
    bold: usize,
    italic: usize,
    strike: usize,
    code: usize,
    link: usize,
    heading: Option<usize>,
    quote_depth: usize,
    lists: Vec<Option<usize>>,
    code_block: Option<CodeBlock>,
    cell_index: usize,
}

impl<'h> LineWriter<'h> {
    fn new(highlighter: &'h Highlighter) -> Self {
        Self {
            highlighter,
            lines: Vec::new(),
            current: Vec::new(),
            has_content: false,
            bold: 0,
            italic: 0,
            strike: 0,
            code: 0,
            link: 0,
            heading: None,
            quote_depth: 0,
            lists: Vec::new(),
            code_block: None,
            cell_index: 0,
        }
    }

    fn tag(&mut self, tag: &Tag) {
        if tag.closing {
            self.close(&tag.name);
        } else {
            self.open(tag);
        }
    }

    fn open(&mut self, tag: &Tag) {
        let name = tag.name.as_str();
        match name {
            "p" | "div" => self.flush(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let level = name[1..].parse().unwrap_or(1);
                self.heading = Some(level);
                let marker = format!("{} ", "#".repeat(level));
                let style = self.style();
                self.push_span(marker, style);
            }
            "ul" => {
                self.flush();
                self.lists.push(None);
            }
            "ol" => {
                self.flush();
                let start = tag
                    .attribute("start")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(1);
                self.lists.push(Some(start));
            }
            "li" => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{}. ", number);
                        *number += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                let indent = "  ".repeat(depth);
                self.push_span(
                    format!("{}{}", indent, marker),
                    Style::default().fg(Color::Cyan),
                );
            }
            "blockquote" => {
                self.flush();
                self.quote_depth += 1;
            }
            "pre" => {
                self.flush();
                self.code_block = Some(CodeBlock::default());
            }
            "code" => {
                self.code += 1;
                if let Some(block) = self.code_block.as_mut() {
                    block.language = tag
                        .attribute("class")
                        .and_then(|class| {
                            class
                                .split_whitespace()
                                .find_map(|c| c.strip_prefix("language-"))
                        })
                        .map(str::to_string);
                }
            }
            "strong" | "b" => self.bold += 1,
            "em" | "i" => self.italic += 1,
            "del" | "s" | "strike" => self.strike += 1,
            "a" => self.link += 1,
            "br" => self.end_line(),
            "hr" => {
                self.flush();
                self.push_content("─".repeat(RULE_WIDTH), Style::default().fg(Color::DarkGray));
                self.flush();
                self.blank();
            }
            "img" => {
                let label = match tag.attribute("alt") {
                    Some(alt) if !alt.is_empty() => format!("[image: {}]", alt),
                    _ => "[image]".to_string(),
                };
                self.push_content(label, Style::default().fg(Color::Magenta));
            }
            "input" => {
                let mark = if tag.attribute("checked").is_some() {
                    "[x]"
                } else {
                    "[ ]"
                };
                self.push_content(mark.to_string(), Style::default().fg(Color::Green));
            }
            "tr" => {
                self.flush();
                self.cell_index = 0;
            }
            "th" | "td" => {
                if self.cell_index > 0 {
                    self.push_content(" │ ".to_string(), Style::default().fg(Color::DarkGray));
                }
                self.cell_index += 1;
                if name == "th" {
                    self.bold += 1;
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "p" | "div" => {
                self.flush();
                self.blank();
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                self.heading = None;
                self.blank();
            }
            "ul" | "ol" => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            "li" => self.flush(),
            "blockquote" => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 {
                    self.blank();
                }
            }
            "pre" => {
                if let Some(block) = self.code_block.take() {
                    self.write_code_block(block);
                }
                self.flush();
                self.blank();
            }
            "code" => self.code = self.code.saturating_sub(1),
            "strong" | "b" => self.bold = self.bold.saturating_sub(1),
            "em" | "i" => self.italic = self.italic.saturating_sub(1),
            "del" | "s" | "strike" => self.strike = self.strike.saturating_sub(1),
            "a" => self.link = self.link.saturating_sub(1),
            "th" => self.bold = self.bold.saturating_sub(1),
            "tr" => self.flush(),
            "table" => {
                self.flush();
                self.blank();
            }
            _ => {}
        }
    }

    fn text(&mut self, raw: &str) {
        let text = decode_entities(raw);
        if let Some(block) = self.code_block.as_mut() {
            block.text.push_str(&text);
            return;
        }
        let style = self.style();

        // Newlines between block elements
        if text.trim().is_empty() && text.contains('\n') {
            return;
        }

        let collapsed = text.replace('\n', " ");
        let collapsed = if self.has_content {
            collapsed.as_str()
        } else {
            collapsed.trim_start()
        };
        if !collapsed.is_empty() {
            self.push_content(collapsed.to_string(), style);
        }
    }

    /// Emit a finished code block, highlighted when its language is known.
    fn write_code_block(&mut self, block: CodeBlock) {
        let code = block.text.strip_suffix('\n').unwrap_or(&block.text);
        if code.is_empty() {
            return;
        }
        let highlighted = self
            .highlighter
            .highlight_code(block.language.as_deref(), code);

        match highlighted {
            Some(lines) => {
                for spans in lines {
                    for span in spans {
                        self.push_content(span.content.into_owned(), span.style);
                    }
                    self.end_line();
                }
            }
            None => {
                let style = Style::default().fg(Color::Yellow);
                for line in code.split('\n') {
                    if !line.is_empty() {
                        self.push_content(line.to_string(), style);
                    }
                    self.end_line();
                }
            }
        }
    }

    fn style(&self) -> Style {
        let mut style = Style::default();
        if self.heading.is_some() {
            style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
        }
        if self.bold > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strike > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        if self.code > 0 {
            style = style.fg(Color::Yellow);
        }
        if self.link > 0 {
            style = style.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
        }
        style
    }

    fn push_span(&mut self, content: String, style: Style) {
        if self.current.is_empty() && self.quote_depth > 0 {
            self.current.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                Style::default().fg(Color::DarkGray),
            ));
        }
        self.current.push(Span::styled(content, style));
    }

    fn push_content(&mut self, content: String, style: Style) {
        self.push_span(content, style);
        self.has_content = true;
    }

    /// Emit the current line if it has content.
    fn flush(&mut self) {
        if self.has_content {
            self.end_line();
        }
    }

    /// Emit the current line unconditionally.
    fn end_line(&mut self) {
        let mut spans = std::mem::take(&mut self.current);
        if let Some(last) = spans.last_mut() {
            let trimmed = last.content.trim_end();
            if trimmed.len() != last.content.len() {
                last.content = trimmed.to_string().into();
            }
        }
        self.lines.push(Line::from(spans));
        self.has_content = false;
    }

    fn blank(&mut self) {
        let last_is_blank = self
            .lines
            .last()
            .map_or(true, |line| line.spans.is_empty());
        if !last_is_blank {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markup: &str) -> Vec<Line<'static>> {
        markup_to_lines(markup, &Highlighter::default())
    }

    fn texts(lines: &[Line<'static>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_heading_and_paragraph() {
        let lines = render("<h1>Title</h1>\n<p>Body <strong>bold</strong></p>\n");
        assert_eq!(texts(&lines), vec!["# Title", "", "Body bold"]);

        let bold = lines[2]
            .spans
            .iter()
            .find(|span| span.content == "bold")
            .unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_lists() {
        let lines = render("<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n");
        assert_eq!(texts(&lines), vec!["• one", "• two"]);

        let lines = render("<ol start=\"3\">\n<li>a</li>\n<li>b</li>\n</ol>\n");
        assert_eq!(texts(&lines), vec!["3. a", "4. b"]);
    }

    #[test]
    fn test_nested_and_loose_lists() {
        let lines =
            render("<ul>\n<li>outer\n<ul>\n<li>inner</li>\n</ul>\n</li>\n</ul>\n");
        assert_eq!(texts(&lines), vec!["• outer", "  • inner"]);

        let lines = render("<ul>\n<li>\n<p>loose</p>\n</li>\n</ul>\n");
        assert_eq!(texts(&lines), vec!["• loose"]);
    }

    #[test]
    fn test_blockquote_prefix() {
        let lines = render("<blockquote>\n<p>quoted</p>\n</blockquote>\n");
        assert_eq!(texts(&lines), vec!["│ quoted"]);
    }

    #[test]
    fn test_code_block_keeps_lines() {
        let lines = render("<pre><code>first\n    second\n\nlast\n</code></pre>\n");
        assert_eq!(texts(&lines), vec!["first", "    second", "", "last"]);
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Yellow));
    }

    #[test]
    fn test_code_block_with_language_is_highlighted() {
        let lines = render(
            "<pre><code class=\"language-rust\">fn main() {\n    run();\n}\n</code></pre>\n<p>after</p>\n",
        );
        assert_eq!(texts(&lines), vec!["fn main() {", "    run();", "}", "", "after"]);
        assert!(lines[..3]
            .iter()
            .flat_map(|line| line.spans.iter())
            .all(|span| matches!(span.style.fg, Some(Color::Rgb(..)))));
    }

    #[test]
    fn test_code_block_with_unknown_language_stays_plain() {
        let lines = render("<pre><code class=\"language-nope\">x = 1\n</code></pre>\n");
        assert_eq!(texts(&lines), vec!["x = 1"]);
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Yellow));
    }

    #[test]
    fn test_code_block_entities_are_decoded_before_highlighting() {
        let lines = render("<pre><code class=\"language-html\">&lt;b&gt;&amp;&lt;/b&gt;\n</code></pre>\n");
        assert_eq!(texts(&lines), vec!["<b>&</b>"]);
    }

    #[test]
    fn test_attribute_values_may_contain_angle_brackets() {
        let lines = render("<p><img src=\"x.png\" alt=\"a>b\"> tail</p>\n");
        assert_eq!(texts(&lines), vec!["[image: a>b] tail"]);

        let lines = render("<p><a href=\"https://example.com/?q=1>2\" title='it&apos;s'>link</a></p>\n");
        assert_eq!(texts(&lines), vec!["link"]);
    }

    #[test]
    fn test_attribute_values_are_decoded() {
        let lines = render("<p><img src=\"x.png\" alt=\"&quot;Tom &amp; Jerry&quot;\"></p>\n");
        assert_eq!(texts(&lines), vec!["[image: \"Tom & Jerry\"]"]);
    }

    #[test]
    fn test_rendered_image_alt_with_angle_bracket() {
        let safe = mdcore::Renderer::new().render_safe("![a>b](x.png) tail");
        assert_eq!(texts(&render(&safe)), vec!["[image: a>b] tail"]);
    }

    #[test]
    fn test_parse_attributes_forms() {
        let tag = Tag::parse(r#"input type="checkbox" checked disabled='' data-x=plain /"#).unwrap();
        assert_eq!(tag.name, "input");
        assert!(!tag.closing);
        assert_eq!(tag.attribute("type"), Some("checkbox"));
        assert_eq!(tag.attribute("checked"), Some(""));
        assert_eq!(tag.attribute("disabled"), Some(""));
        assert_eq!(tag.attribute("data-x"), Some("plain"));

        assert!(Tag::parse("!-- comment --").is_none());
        assert!(Tag::parse("/p").unwrap().closing);
    }

    #[test]
    fn test_hard_breaks() {
        let lines = render("<p>first<br>\nsecond</p>\n");
        assert_eq!(texts(&lines), vec!["first", "second"]);
    }

    #[test]
    fn test_entities_are_decoded() {
        let lines = render("<p>a &amp; b &lt;tag&gt; &quot;q&quot; &#39;s&#x27; &bogus</p>");
        assert_eq!(texts(&lines), vec!["a & b <tag> \"q\" 's' &bogus"]);
    }

    #[test]
    fn test_task_checkboxes() {
        let lines = render(
            "<ul>\n<li><input type=\"checkbox\" checked=\"\" disabled=\"\"> done</li>\n<li><input type=\"checkbox\" disabled=\"\"> todo</li>\n</ul>\n",
        );
        assert_eq!(texts(&lines), vec!["• [x] done", "• [ ] todo"]);
    }

    #[test]
    fn test_table_cells() {
        let lines = render(
            "<table>\n<thead>\n<tr>\n<th>A</th>\n<th>B</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td>1</td>\n<td>2</td>\n</tr>\n</tbody>\n</table>\n",
        );
        assert_eq!(texts(&lines), vec!["A │ B", "1 │ 2"]);
    }

    #[test]
    fn test_links_images_and_rules() {
        let lines = render(
            "<p><a href=\"https://doc.rust-lang.org/book/\" rel=\"noopener noreferrer\">Book</a> <img src=\"logo.png\" alt=\"Rust logo\"></p>\n<hr>\n",
        );
        assert_eq!(
            texts(&lines),
            vec!["Book [image: Rust logo]".to_string(), "─".repeat(RULE_WIDTH)]
        );
        assert!(lines[0].spans[0]
            .style
            .add_modifier
            .contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_empty_markup() {
        assert!(render("").is_empty());
    }

    #[test]
    fn test_raw_lines() {
        let lines = raw_lines("<p>a</p>\n<p>b</p>\n");
        assert_eq!(texts(&lines), vec!["<p>a</p>", "<p>b</p>"]);
    }
}
