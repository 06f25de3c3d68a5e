//! Terminal user interface for the Scribe assistant.
//!
//! Three panels: a templates sidebar, a document viewer and the chat
//! transcript with its input line. The [`app`] module owns the event loop;
//! [`markdown`] and [`transcript`] form the render projection.

pub mod app;
pub mod detail;
pub mod markdown;
pub mod sidebar;
pub mod transcript;
pub mod viewer;

pub use app::App;
pub use markdown::MarkdownRenderer;

use scribe_engine::ScribeConfig;

/// Set up the terminal, run the app to completion, restore the terminal.
pub async fn run(config: ScribeConfig) -> anyhow::Result<()> {
    let terminal = ratatui::init();
    let result = match App::new(&config) {
        Ok(app) => app.run(terminal).await,
        Err(err) => Err(err),
    };
    ratatui::restore();
    result
}
