//! Template document viewer.
//!
//! Center panel showing the selected template's assembled content rendered
//! as markdown. The document is rendered once when it loads; scrolling is
//! an offset over the cached lines.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::markdown::MarkdownRenderer;

enum ViewerState {
    Empty,
    Loading { name: String },
    Ready { name: String, lines: Vec<Line<'static>> },
    Failed { message: String },
}

/// State of the document panel.
pub struct DocumentViewer {
    renderer: MarkdownRenderer,
    state: ViewerState,
    pub scroll: u16,
}

impl Default for DocumentViewer {
    fn default() -> Self {
        Self {
            renderer: MarkdownRenderer::new(),
            state: ViewerState::Empty,
            scroll: 0,
        }
    }
}

impl DocumentViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_loading(&mut self, name: &str) {
        self.state = ViewerState::Loading {
            name: name.to_string(),
        };
        self.scroll = 0;
    }

    /// Install a loaded document; renders it once.
    pub fn set_content(&mut self, name: &str, content: &str) {
        self.state = ViewerState::Ready {
            name: name.to_string(),
            lines: self.renderer.render(content),
        };
        self.scroll = 0;
    }

    pub fn set_error(&mut self, message: String) {
        self.state = ViewerState::Failed { message };
        self.scroll = 0;
    }

    /// Title for the panel border.
    pub fn title(&self) -> String {
        match &self.state {
            ViewerState::Empty => "Template".to_string(),
            ViewerState::Loading { name } | ViewerState::Ready { name, .. } => name.clone(),
            ViewerState::Failed { .. } => "Template".to_string(),
        }
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        match &self.state {
            ViewerState::Empty => vec![Line::from(Span::styled(
                "Select a template to view its content",
                Style::default().fg(Color::DarkGray),
            ))],
            ViewerState::Loading { .. } => vec![Line::from(Span::styled(
                "loading…",
                Style::default().fg(Color::DarkGray),
            ))],
            ViewerState::Ready { lines, .. } => lines.clone(),
            ViewerState::Failed { message } => vec![Line::from(Span::styled(
                format!("Error loading template: {message}"),
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            ))],
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn flat(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_states() {
        let mut viewer = DocumentViewer::new();
        assert!(flat(&viewer.lines()).contains("Select a template"));

        viewer.set_loading("Report");
        assert!(flat(&viewer.lines()).contains("loading"));
        assert_eq!(viewer.title(), "Report");

        viewer.set_content("Report", "# Heading\n\nbody");
        let text = flat(&viewer.lines());
        assert!(text.contains("Heading"));
        assert!(text.contains("body"));

        viewer.set_error("404".to_string());
        assert!(flat(&viewer.lines()).contains("Error loading template: 404"));
    }

    #[test]
    fn test_scroll_clamps_at_zero() {
        let mut viewer = DocumentViewer::new();
        viewer.scroll_up();
        assert_eq!(viewer.scroll, 0);
        viewer.scroll_down();
        viewer.scroll_down();
        viewer.scroll_up();
        assert_eq!(viewer.scroll, 1);
    }
}
