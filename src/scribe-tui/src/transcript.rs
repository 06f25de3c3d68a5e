//! Chat transcript projection.
//!
//! Pure view over the session's turn list: each turn renders as a styled
//! block (role header plus markdown body). Rendered bodies are cached per
//! turn, keyed by content length and status, so a delta to the streaming
//! turn never re-parses the rest of the conversation.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use scribe_protocol::{ChatTurn, Role, TurnStatus};

use crate::markdown::MarkdownRenderer;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

struct CachedTurn {
    content_len: usize,
    status: TurnStatus,
    lines: Vec<Line<'static>>,
}

/// Renders the ordered turn list into display lines.
#[derive(Default)]
pub struct TranscriptView {
    renderer: MarkdownRenderer,
    cache: Vec<CachedTurn>,
    spinner_frame: usize,
    rebuilds: usize,
}

impl TranscriptView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the in-progress spinner animation.
    pub fn tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }

    /// How many per-turn renders have happened. Only the mutated turn
    /// should add to this between frames.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Project the turns into display lines.
    pub fn lines(&mut self, turns: &[ChatTurn]) -> Vec<Line<'static>> {
        if turns.is_empty() {
            return greeting();
        }
        self.cache.truncate(turns.len());

        let mut out = Vec::new();
        for (i, turn) in turns.iter().enumerate() {
            self.refresh_cache(i, turn);

            if i > 0 {
                out.push(Line::default());
            }
            out.push(header(turn));
            out.extend(self.cache[i].lines.iter().cloned());

            match turn.status {
                TurnStatus::Streaming => {
                    let frame = SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()];
                    out.push(Line::from(Span::styled(
                        format!("{frame} typing…"),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                TurnStatus::Errored => {
                    out.push(Line::from(Span::styled(
                        "Error: failed to send message",
                        Style::default().fg(Color::Red),
                    )));
                }
                TurnStatus::Complete => {}
            }

            if turn.linked_ref.is_some() {
                out.push(Line::from(Span::styled(
                    "linked detail available (ctrl+o)",
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        out
    }

    fn refresh_cache(&mut self, i: usize, turn: &ChatTurn) {
        let stale = match self.cache.get(i) {
            Some(cached) => {
                cached.content_len != turn.content.len() || cached.status != turn.status
            }
            None => true,
        };
        if !stale {
            return;
        }
        let entry = CachedTurn {
            content_len: turn.content.len(),
            status: turn.status,
            lines: self.renderer.render(&turn.content),
        };
        self.rebuilds += 1;
        if i < self.cache.len() {
            self.cache[i] = entry;
        } else {
            self.cache.push(entry);
        }
    }
}

fn header(turn: &ChatTurn) -> Line<'static> {
    let (label, color) = match turn.role {
        Role::User => ("You", Color::Magenta),
        Role::Assistant => ("Assistant", Color::Cyan),
    };
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn greeting() -> Vec<Line<'static>> {
    vec![
        Line::default(),
        Line::from(Span::styled(
            "Welcome!",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::raw(
            "Start a conversation about your template.",
        )),
    ]
}
