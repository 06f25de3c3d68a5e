//! Linked-reference detail popup.
//!
//! Modal overlay showing the detail record behind a linked reference.
//! Side-fetch failures render inside the popup only; the conversation and
//! document panels are never affected.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use scribe_protocol::DetailRecord;

use crate::markdown::MarkdownRenderer;

/// Popup lifecycle.
pub enum DetailPopup {
    Hidden,
    Loading,
    Ready {
        title: String,
        lines: Vec<Line<'static>>,
    },
    Failed {
        message: String,
    },
}

impl Default for DetailPopup {
    fn default() -> Self {
        Self::Hidden
    }
}

impl DetailPopup {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Hidden)
    }

    pub fn close(&mut self) {
        *self = Self::Hidden;
    }

    pub fn open_loading(&mut self) {
        *self = Self::Loading;
    }

    /// Install a fetched record, rendering description and content once.
    pub fn set_record(&mut self, record: DetailRecord) {
        let renderer = MarkdownRenderer::new();
        let mut lines = Vec::new();
        if !record.description.is_empty() {
            lines.push(Line::from(Span::styled(
                record.description.clone(),
                Style::default().add_modifier(Modifier::ITALIC),
            )));
            lines.push(Line::default());
        }
        lines.extend(renderer.render(&record.content));
        *self = Self::Ready {
            title: record.name,
            lines,
        };
    }

    pub fn set_error(&mut self, message: String) {
        *self = Self::Failed { message };
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Ready { title, .. } => title,
            _ => "Detail",
        }
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        match self {
            Self::Hidden => Vec::new(),
            Self::Loading => vec![Line::from(Span::styled(
                "loading…",
                Style::default().fg(Color::DarkGray),
            ))],
            Self::Ready { lines, .. } => lines.clone(),
            Self::Failed { message } => vec![Line::from(Span::styled(
                format!("Error: {message}"),
                Style::default().fg(Color::Red),
            ))],
        }
    }

    /// Centered overlay area within `parent`.
    pub fn area(parent: Rect) -> Rect {
        let width = (parent.width * 4 / 5).clamp(20, 80);
        let height = (parent.height * 3 / 5).max(8).min(parent.height);
        let x = parent.x + (parent.width.saturating_sub(width)) / 2;
        let y = parent.y + (parent.height.saturating_sub(height)) / 2;
        Rect::new(x, y, width, height)
    }
}
