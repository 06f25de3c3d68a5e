//! Chat backend client.
//!
//! The [`ChatBackend`] trait is the seam between the session controller and
//! the network: the HTTP implementation lives here, test doubles live next
//! to the controller tests. Session creation and message submission follow
//! the backend's REST surface; message responses stream back as
//! event-stream frames.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribe_protocol::{SessionId, StreamFrame};

use crate::config::ScribeConfig;
use crate::error::{Result, ScribeError};
use crate::sse::frame_stream;

/// Connect timeout for all requests. Streaming responses carry no overall
/// deadline; a stalled transport surfaces as a stream error instead.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A lazy, finite, non-restartable stream of decoded frames.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<StreamFrame>> + Send>>;

/// The chat backend consumed by the session controller.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Ask the server to mint a new session identifier.
    async fn create_session(&self) -> Result<SessionId>;

    /// Submit one message against an existing session, obtaining the
    /// response as a stream of text deltas.
    async fn send_message(&self, session: &SessionId, text: &str) -> Result<FrameStream>;
}

#[derive(Debug, Deserialize)]
struct CreatedSession {
    id: SessionId,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    message: &'a str,
}

/// HTTP implementation of [`ChatBackend`].
pub struct ChatClient {
    http: Client,
    base_url: String,
    request_timeout: Duration,
}

impl ChatClient {
    /// Create a client against the configured backend.
    pub fn new(config: &ScribeConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ScribeError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Check whether the backend is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(resp.status().is_success())
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn create_session(&self) -> Result<SessionId> {
        let url = format!("{}/api/chats", self.base_url);
        let resp = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(&json!({}))
            .send()
            .await?;
        let resp = check_status(resp, "create session").await?;
        let created: CreatedSession = resp.json().await?;
        tracing::debug!(session = %created.id, "session created");
        Ok(created.id)
    }

    async fn send_message(&self, session: &SessionId, text: &str) -> Result<FrameStream> {
        let url = format!("{}/api/chats/{}", self.base_url, session);
        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&MessageRequest { message: text })
            .send()
            .await?;
        let resp = check_status(resp, "send message").await?;
        Ok(Box::pin(frame_stream(resp.bytes_stream())))
    }
}

/// Map a non-success response to a transport error carrying a body preview.
pub(crate) async fn check_status(
    resp: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let preview = if body.len() > 200 {
        format!("{}...", &body[..200])
    } else {
        body
    };
    tracing::warn!(%status, context, body = %preview, "request failed");
    Err(ScribeError::Transport(format!(
        "{context} failed: HTTP {status}: {preview}"
    )))
}
