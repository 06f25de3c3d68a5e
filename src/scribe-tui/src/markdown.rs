//! Markdown rendering for the terminal.
//!
//! Converts markdown source to styled ratatui `Line`s via pulldown-cmark:
//! paragraphs, emphasis, headings, lists, links, inline and fenced code,
//! blockquotes, rules and tables. Raw HTML is never interpreted; it is
//! emitted as literal text, and control characters are stripped from every
//! span so adversarial input cannot inject terminal escapes.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

/// Styles for rendered markdown elements.
#[derive(Debug, Clone)]
pub struct MarkdownTheme {
    pub heading: Style,
    pub code: Style,
    pub code_block: Style,
    pub link: Style,
    pub link_url: Style,
    pub blockquote: Style,
    pub rule: Style,
    pub html_literal: Style,
    pub table_header: Style,
}

impl Default for MarkdownTheme {
    fn default() -> Self {
        Self {
            heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            code: Style::default().fg(Color::Yellow),
            code_block: Style::default().fg(Color::Yellow),
            link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            link_url: Style::default().fg(Color::DarkGray),
            blockquote: Style::default().fg(Color::DarkGray),
            rule: Style::default().fg(Color::DarkGray),
            html_literal: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            table_header: Style::default().add_modifier(Modifier::BOLD),
        }
    }
}

/// Markdown renderer.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    theme: MarkdownTheme,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render markdown to styled lines. Wrapping is left to the widget
    /// that displays them.
    pub fn render(&self, markdown: &str) -> Vec<Line<'static>> {
        let mut state = RenderState::new(&self.theme);
        let parser = Parser::new_ext(markdown, Self::options());
        for event in parser {
            state.handle_event(event);
        }
        state.finish()
    }

    fn options() -> Options {
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
    }
}

/// Remove characters that could drive the terminal rather than display:
/// everything in the control range except tabs, which become spaces.
fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\t' {
            out.push_str("    ");
        } else if !c.is_control() {
            out.push(c);
        }
    }
    out
}

struct TableState {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    current_row: Vec<String>,
    current_cell: String,
    in_header: bool,
}

struct RenderState<'a> {
    theme: &'a MarkdownTheme,
    lines: Vec<Line<'static>>,
    current_spans: Vec<Span<'static>>,
    style_stack: Vec<Style>,

    list_stack: Vec<Option<u64>>,
    blockquote_depth: usize,

    in_code_block: bool,
    code_buffer: String,

    table: Option<TableState>,
    current_link_url: Option<String>,
}

impl<'a> RenderState<'a> {
    fn new(theme: &'a MarkdownTheme) -> Self {
        Self {
            theme,
            lines: Vec::new(),
            current_spans: Vec::new(),
            style_stack: Vec::new(),
            list_stack: Vec::new(),
            blockquote_depth: 0,
            in_code_block: false,
            code_buffer: String::new(),
            table: None,
            current_link_url: None,
        }
    }

    fn handle_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.handle_start(tag),
            Event::End(tag) => self.handle_end(tag),
            Event::Text(text) => self.handle_text(&text),
            Event::Code(code) => self.push_span(&code, Some(self.theme.code)),
            Event::InlineMath(math) => self.push_span(&math, Some(self.theme.code)),
            Event::DisplayMath(math) => self.push_span(&math, Some(self.theme.code)),
            // Raw HTML is passed through as literal text, never interpreted.
            Event::Html(html) => self.handle_html(&html),
            Event::InlineHtml(html) => self.handle_html(&html),
            Event::SoftBreak => self.push_span(" ", None),
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.blank_separator();
                self.lines
                    .push(Line::from(Span::styled("─".repeat(40), self.theme.rule)));
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_span(marker, None);
            }
            Event::FootnoteReference(_) => {}
        }
    }

    fn handle_start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.list_stack.is_empty() && self.blockquote_depth == 0 {
                    self.blank_separator();
                }
            }
            Tag::Heading { .. } => {
                self.blank_separator();
                self.style_stack.push(self.theme.heading);
            }
            Tag::CodeBlock(kind) => {
                self.flush_line();
                self.blank_separator();
                self.in_code_block = true;
                self.code_buffer.clear();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.lines.push(Line::from(Span::styled(
                            sanitize(&lang),
                            self.theme.rule,
                        )));
                    }
                }
            }
            Tag::List(start) => {
                if self.list_stack.is_empty() {
                    self.blank_separator();
                }
                self.list_stack.push(start);
            }
            Tag::Item => {
                self.flush_line();
                let indent = "  ".repeat(self.list_stack.len().saturating_sub(1));
                let bullet = match self.list_stack.last() {
                    Some(Some(n)) => format!("{indent}{n}. "),
                    _ => format!("{indent}- "),
                };
                self.current_spans.push(Span::raw(bullet));
            }
            Tag::BlockQuote(_) => {
                self.flush_line();
                if self.blockquote_depth == 0 {
                    self.blank_separator();
                }
                self.blockquote_depth += 1;
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT));
            }
            Tag::Link { dest_url, .. } => {
                self.current_link_url = Some(dest_url.to_string());
                self.style_stack.push(self.theme.link);
            }
            Tag::Table(_) => {
                self.flush_line();
                self.blank_separator();
                self.table = Some(TableState {
                    headers: Vec::new(),
                    rows: Vec::new(),
                    current_row: Vec::new(),
                    current_cell: String::new(),
                    in_header: false,
                });
            }
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.in_header = true;
                }
            }
            Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.current_row.clear();
                }
            }
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.current_cell.clear();
                }
            }
            // Images and the remaining block kinds have no terminal
            // representation here.
            _ => {}
        }
    }

    fn handle_end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush_line(),
            TagEnd::Heading(_) => {
                self.style_stack.pop();
                self.flush_line();
            }
            TagEnd::CodeBlock => self.end_code_block(),
            TagEnd::List(_) => {
                self.flush_line();
                self.list_stack.pop();
            }
            TagEnd::Item => {
                self.flush_line();
                if let Some(Some(n)) = self.list_stack.last_mut() {
                    *n += 1;
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.blockquote_depth = self.blockquote_depth.saturating_sub(1);
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.style_stack.pop();
            }
            TagEnd::Link => {
                self.style_stack.pop();
                if let Some(url) = self.current_link_url.take() {
                    self.current_spans.push(Span::styled(
                        format!(" ({})", sanitize(&url)),
                        self.theme.link_url,
                    ));
                }
            }
            TagEnd::Table => self.end_table(),
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.in_header = false;
                    table.headers = std::mem::take(&mut table.current_row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    if !table.in_header {
                        let row = std::mem::take(&mut table.current_row);
                        table.rows.push(row);
                    }
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.current_cell);
                    table.current_row.push(cell.trim().to_string());
                }
            }
            _ => {}
        }
    }

    fn handle_text(&mut self, text: &str) {
        if self.in_code_block {
            self.code_buffer.push_str(text);
        } else {
            self.push_span(text, None);
        }
    }

    fn handle_html(&mut self, html: &str) {
        // Block-level HTML arrives with trailing newlines; render each
        // line as literal text so nothing reaches the terminal as markup.
        for (i, line) in html.lines().enumerate() {
            if i > 0 {
                self.flush_line();
            }
            if !line.is_empty() {
                self.current_spans
                    .push(Span::styled(sanitize(line), self.theme.html_literal));
            }
        }
        if html.ends_with('\n') {
            self.flush_line();
        }
    }

    fn push_style(&mut self, style: Style) {
        self.style_stack.push(style);
    }

    fn current_style(&self) -> Style {
        self.style_stack
            .iter()
            .fold(Style::default(), |acc, s| acc.patch(*s))
    }

    fn push_span(&mut self, text: &str, style: Option<Style>) {
        // Inside a table, every inline fragment belongs to the open cell.
        if let Some(table) = self.table.as_mut() {
            table.current_cell.push_str(&sanitize(text));
            return;
        }
        let style = style.unwrap_or_else(|| self.current_style());
        self.current_spans.push(Span::styled(sanitize(text), style));
    }

    /// Push an empty separator line between blocks.
    fn blank_separator(&mut self) {
        if !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
    }

    fn flush_line(&mut self) {
        if self.current_spans.is_empty() {
            return;
        }
        let mut spans = Vec::new();
        for _ in 0..self.blockquote_depth {
            spans.push(Span::styled("│ ", self.theme.blockquote));
        }
        spans.append(&mut self.current_spans);
        self.lines.push(Line::from(spans));
    }

    fn end_code_block(&mut self) {
        self.in_code_block = false;
        let buffer = std::mem::take(&mut self.code_buffer);
        for line in buffer.lines() {
            let mut spans = Vec::new();
            for _ in 0..self.blockquote_depth {
                spans.push(Span::styled("│ ", self.theme.blockquote));
            }
            spans.push(Span::raw("  "));
            spans.push(Span::styled(sanitize(line), self.theme.code_block));
            self.lines.push(Line::from(spans));
        }
    }

    fn end_table(&mut self) {
        let Some(table) = self.table.take() else {
            return;
        };
        let columns = table
            .rows
            .iter()
            .chain(std::iter::once(&table.headers))
            .map(Vec::len)
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }

        let mut widths = vec![0usize; columns];
        for row in std::iter::once(&table.headers).chain(table.rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let format_row = |row: &[String]| -> String {
            (0..columns)
                .map(|i| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    format!("{cell:<width$}", width = widths[i])
                })
                .collect::<Vec<_>>()
                .join(" | ")
        };

        self.lines.push(Line::from(Span::styled(
            format_row(&table.headers),
            self.theme.table_header,
        )));
        let separator = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        self.lines
            .push(Line::from(Span::styled(separator, self.theme.rule)));
        for row in &table.rows {
            self.lines.push(Line::from(Span::raw(format_row(row))));
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        // Auto-close an unterminated code block: streaming content often
        // ends mid-fence.
        if self.in_code_block {
            self.end_code_block();
        }
        if self.table.is_some() {
            self.end_table();
        }
        self.flush_line();
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn text_of(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn test_paragraphs_separated_by_blank_line() {
        let renderer = MarkdownRenderer::new();
        let lines = text_of(&renderer.render("first\n\nsecond"));
        assert_eq!(lines, vec!["first", "", "second"]);
    }

    #[test]
    fn test_heading_is_styled() {
        let renderer = MarkdownRenderer::new();
        let lines = renderer.render("# Title");
        assert_eq!(text_of(&lines), vec!["Title"]);
        assert!(
            lines[0].spans[0]
                .style
                .add_modifier
                .contains(Modifier::BOLD)
        );
    }

    #[test]
    fn test_unordered_and_ordered_lists() {
        let renderer = MarkdownRenderer::new();
        let lines = text_of(&renderer.render("- a\n- b"));
        assert_eq!(lines, vec!["- a", "- b"]);

        let lines = text_of(&renderer.render("1. a\n2. b"));
        assert_eq!(lines, vec!["1. a", "2. b"]);
    }

    #[test]
    fn test_task_list_markers() {
        let renderer = MarkdownRenderer::new();
        let lines = text_of(&renderer.render("- [x] done\n- [ ] open"));
        assert_eq!(lines, vec!["- [x] done", "- [ ] open"]);
    }

    #[test]
    fn test_link_shows_destination() {
        let renderer = MarkdownRenderer::new();
        let lines = text_of(&renderer.render("[docs](https://example.com)"));
        assert_eq!(lines, vec!["docs (https://example.com)"]);
    }

    #[test]
    fn test_code_block_is_indented() {
        let renderer = MarkdownRenderer::new();
        let lines = text_of(&renderer.render("```rust\nlet x = 1;\n```"));
        assert_eq!(lines, vec!["rust", "  let x = 1;"]);
    }

    #[test]
    fn test_unterminated_code_block_still_renders() {
        let renderer = MarkdownRenderer::new();
        let lines = text_of(&renderer.render("```\npartial"));
        assert_eq!(lines, vec!["  partial"]);
    }

    #[test]
    fn test_table_renders_all_cells() {
        let renderer = MarkdownRenderer::new();
        let lines = text_of(&renderer.render("| a | b |\n|---|---|\n| 1 | 2 |"));
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains('a') && lines[0].contains('b'));
        assert!(lines[2].contains('1') && lines[2].contains('2'));
    }

    #[test]
    fn test_blockquote_prefix() {
        let renderer = MarkdownRenderer::new();
        let lines = text_of(&renderer.render("> quoted"));
        assert_eq!(lines, vec!["│ quoted"]);
    }

    #[test]
    fn test_raw_html_is_literal_text() {
        let renderer = MarkdownRenderer::new();
        let input = "before\n\n<script>alert('x')</script>\n\nafter";
        let lines = renderer.render(input);
        let flat = text_of(&lines).join("\n");
        // The tag text survives as inert content; nothing is dropped or
        // interpreted as structure.
        assert!(flat.contains("<script>alert('x')</script>"));
        assert!(flat.contains("before"));
        assert!(flat.contains("after"));
    }

    #[test]
    fn test_inline_html_is_literal_text() {
        let renderer = MarkdownRenderer::new();
        let lines = renderer.render("a <img src=x onerror=alert(1)> b");
        let flat = text_of(&lines).join("\n");
        assert!(flat.contains("<img src=x onerror=alert(1)>"));
    }

    #[test]
    fn test_control_characters_are_stripped() {
        let renderer = MarkdownRenderer::new();
        let lines = renderer.render("red \u{1b}[31mtext\u{7}");
        let flat = text_of(&lines).join("\n");
        assert!(!flat.contains('\u{1b}'));
        assert!(!flat.contains('\u{7}'));
        assert!(flat.contains("red"));
        assert!(flat.contains("text"));
    }

    #[test]
    fn test_emphasis_styles_apply() {
        let renderer = MarkdownRenderer::new();
        let lines = renderer.render("**bold** and *italic*");
        let bold = lines[0]
            .spans
            .iter()
            .find(|s| s.content.as_ref() == "bold")
            .expect("bold span");
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        let italic = lines[0]
            .spans
            .iter()
            .find(|s| s.content.as_ref() == "italic")
            .expect("italic span");
        assert!(italic.style.add_modifier.contains(Modifier::ITALIC));
    }
}
