//! Application state and event loop.
//!
//! One cooperative task owns every piece of mutable state. Network workers
//! report back over channels: session updates from the streaming worker,
//! app events from the template/detail fetches. The loop applies whichever
//! message arrives next, then redraws, so partial output is progressively
//! visible between deltas.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};
use ratatui::{DefaultTerminal, Frame};
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

use scribe_engine::{
    ChatClient, ScribeConfig, SessionController, SessionUpdate, TemplatesClient,
};
use scribe_protocol::{DetailRecord, TemplateSummary};

use crate::detail::DetailPopup;
use crate::sidebar::TemplatesSidebar;
use crate::transcript::TranscriptView;
use crate::viewer::DocumentViewer;

/// Spinner cadence.
const TICK: Duration = Duration::from_millis(120);

/// Result of a background fetch, reported to the UI task.
pub enum AppEvent {
    Templates(Result<Vec<TemplateSummary>, String>),
    Document {
        name: String,
        result: Result<String, String>,
    },
    Detail(Result<DetailRecord, String>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Focus {
    Sidebar,
    Chat,
}

pub struct App {
    controller: SessionController,
    updates_rx: mpsc::UnboundedReceiver<SessionUpdate>,
    chat: Arc<ChatClient>,
    templates: Arc<TemplatesClient>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,

    sidebar: TemplatesSidebar,
    viewer: DocumentViewer,
    transcript: TranscriptView,
    popup: DetailPopup,
    focus: Focus,
    /// 0 keeps the transcript pinned to the newest line.
    chat_scroll_from_bottom: u16,
    should_quit: bool,
}

impl App {
    pub fn new(config: &ScribeConfig) -> Result<Self> {
        let chat = Arc::new(ChatClient::new(config)?);
        let (controller, updates_rx) = SessionController::new(chat.clone());
        let templates = Arc::new(TemplatesClient::new(config)?);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Self {
            controller,
            updates_rx,
            chat,
            templates,
            events_tx,
            events_rx,
            sidebar: TemplatesSidebar::new(),
            viewer: DocumentViewer::new(),
            transcript: TranscriptView::new(),
            popup: DetailPopup::default(),
            focus: Focus::Chat,
            chat_scroll_from_bottom: 0,
            should_quit: false,
        })
    }

    pub async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        self.spawn_health_check();
        self.spawn_template_fetch();

        let mut input = EventStream::new();
        let mut ticker = tokio::time::interval(TICK);

        while !self.should_quit {
            terminal.draw(|frame| self.draw(frame))?;

            tokio::select! {
                maybe_event = input.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.on_key(key);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::error!(%err, "input stream error");
                        self.should_quit = true;
                    }
                    None => self.should_quit = true,
                },
                Some(update) = self.updates_rx.recv() => self.controller.apply(update),
                Some(event) = self.events_rx.recv() => self.on_app_event(event),
                _ = ticker.tick() => self.transcript.tick(),
            }
        }

        // Teardown: stop consuming and release any in-flight transport.
        self.controller.shutdown();
        Ok(())
    }

    fn spawn_health_check(&self) {
        let chat = self.chat.clone();
        tokio::spawn(async move {
            match chat.health_check().await {
                Ok(true) => tracing::info!("backend reachable"),
                Ok(false) => tracing::warn!("backend unhealthy"),
                Err(err) => tracing::warn!(%err, "backend health check failed"),
            }
        });
    }

    fn spawn_template_fetch(&self) {
        let templates = self.templates.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = templates
                .list_templates()
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::Templates(result));
        });
    }

    fn open_selected_template(&mut self) {
        let Some(template) = self.sidebar.selected() else {
            return;
        };
        let id = template.id.clone();
        let name = template.name.clone();
        self.viewer.set_loading(&name);

        let templates = self.templates.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = templates
                .get_content(&id)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::Document { name, result });
        });
    }

    /// Resolve the relevant linked reference: the newest turn carrying one
    /// wins, else the selected template's linked prompt.
    fn linked_reference(&self) -> Option<String> {
        let from_turn = self
            .controller
            .session()
            .turns()
            .iter()
            .rev()
            .find_map(|t| t.linked_ref.clone());
        from_turn.or_else(|| {
            self.sidebar
                .selected()
                .and_then(|t| t.linked_ref())
                .map(str::to_string)
        })
    }

    fn open_detail(&mut self) {
        let Some(reference) = self.linked_reference() else {
            return;
        };
        self.popup.open_loading();

        let templates = self.templates.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = templates
                .get_detail(&reference)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::Detail(result));
        });
    }

    fn on_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Templates(Ok(templates)) => self.sidebar.set_templates(templates),
            AppEvent::Templates(Err(err)) => self.sidebar.set_error(err),
            AppEvent::Document { name, result } => match result {
                Ok(content) => self.viewer.set_content(&name, &content),
                Err(err) => self.viewer.set_error(err),
            },
            AppEvent::Detail(result) => {
                // The popup may have been dismissed while the fetch ran.
                if !self.popup.is_open() {
                    return;
                }
                match result {
                    Ok(record) => self.popup.set_record(record),
                    Err(err) => self.popup.set_error(err),
                }
            }
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('q') => {
                    self.should_quit = true;
                }
                KeyCode::Char('o') => self.open_detail(),
                _ => {}
            }
            return;
        }

        if self.popup.is_open() {
            if key.code == KeyCode::Esc {
                self.popup.close();
            }
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Sidebar => Focus::Chat,
                    Focus::Chat => Focus::Sidebar,
                };
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::PageUp => self.viewer.scroll_up(),
            KeyCode::PageDown => self.viewer.scroll_down(),
            _ => match self.focus {
                Focus::Sidebar => self.on_sidebar_key(key),
                Focus::Chat => self.on_chat_key(key),
            },
        }
    }

    fn on_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.sidebar.select_prev(),
            KeyCode::Down => self.sidebar.select_next(),
            KeyCode::Enter => self.open_selected_template(),
            _ => {}
        }
    }

    fn on_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if self.controller.submit() {
                    self.chat_scroll_from_bottom = 0;
                }
            }
            KeyCode::Backspace => self.controller.pop_draft_char(),
            KeyCode::Up => {
                self.chat_scroll_from_bottom = self.chat_scroll_from_bottom.saturating_add(1);
            }
            KeyCode::Down => {
                self.chat_scroll_from_bottom = self.chat_scroll_from_bottom.saturating_sub(1);
            }
            KeyCode::Char(c) => self.controller.push_draft_char(c),
            _ => {}
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let [sidebar_area, viewer_area, chat_area] = Layout::horizontal([
            Constraint::Length(28),
            Constraint::Min(30),
            Constraint::Length(44),
        ])
        .areas(frame.area());

        self.draw_sidebar(frame, sidebar_area);
        self.draw_viewer(frame, viewer_area);
        self.draw_chat(frame, chat_area);

        if self.popup.is_open() {
            self.draw_popup(frame);
        }
    }

    fn border_style(&self, focus: Focus) -> Style {
        if self.focus == focus && !self.popup.is_open() {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    }

    fn draw_sidebar(&mut self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Sidebar;
        let block = Block::bordered()
            .title("Templates")
            .border_style(self.border_style(Focus::Sidebar));
        let paragraph = Paragraph::new(self.sidebar.lines(focused)).block(block);
        frame.render_widget(paragraph, area);
    }

    fn draw_viewer(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .title(self.viewer.title())
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(self.viewer.lines())
            .wrap(Wrap { trim: false })
            .scroll((self.viewer.scroll, 0))
            .block(block);
        frame.render_widget(paragraph, area);
    }

    fn draw_chat(&mut self, frame: &mut Frame, area: Rect) {
        let [transcript_area, input_area] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(3)]).areas(area);

        let turns = self.controller.session().turns();
        let lines = self.transcript.lines(turns);
        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });

        // Pin to the newest content unless the user scrolled back.
        let inner_width = transcript_area.width.saturating_sub(2);
        let inner_height = transcript_area.height.saturating_sub(2);
        let total = paragraph.line_count(inner_width) as u16;
        let max_scroll = total.saturating_sub(inner_height);
        self.chat_scroll_from_bottom = self.chat_scroll_from_bottom.min(max_scroll);
        let scroll = max_scroll - self.chat_scroll_from_bottom;

        let block = Block::bordered()
            .title("Chat")
            .border_style(self.border_style(Focus::Chat));
        frame.render_widget(paragraph.scroll((scroll, 0)).block(block), transcript_area);

        self.draw_input(frame, input_area);
    }

    fn draw_input(&mut self, frame: &mut Frame, area: Rect) {
        let streaming = self.controller.is_streaming();
        let title = if streaming { "Message (waiting…)" } else { "Message" };

        // Show the tail of the draft when it outgrows the box.
        let max_width = area.width.saturating_sub(3) as usize;
        let mut visible = self.controller.draft().to_string();
        while visible.width() > max_width && !visible.is_empty() {
            visible.remove(0);
        }

        let block = Block::bordered()
            .title(title)
            .border_style(self.border_style(Focus::Chat));
        frame.render_widget(Paragraph::new(visible.clone()).block(block), area);

        if self.focus == Focus::Chat && !self.popup.is_open() {
            frame.set_cursor_position((
                area.x + 1 + visible.width() as u16,
                area.y + 1,
            ));
        }
    }

    fn draw_popup(&mut self, frame: &mut Frame) {
        let area = DetailPopup::area(frame.area());
        frame.render_widget(Clear, area);
        let block = Block::bordered()
            .title(self.popup.title().to_string())
            .border_style(Style::default().fg(Color::Cyan));
        let paragraph = Paragraph::new(self.popup.lines())
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(paragraph, area);
    }
}
