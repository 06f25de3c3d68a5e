//! Templates collaborator client.
//!
//! List, fetch and update template documents, plus the detail lookup used
//! for linked references. The chunk join rule lives here: it is a contract
//! the viewer/editor relies on and is tested as such.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use scribe_protocol::{DetailRecord, TemplateChunk, TemplateSummary};

use crate::client::check_status;
use crate::config::ScribeConfig;
use crate::error::{Result, ScribeError};

/// Separator inserted between chunks when assembling a document.
///
/// A blank line, so that adjacent chunks render as separate markdown
/// blocks. Changing this changes the documented join contract.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Assemble a template's full content from its stored chunks.
///
/// Chunks are sorted by ascending order, trimmed, dropped when empty after
/// trimming, and joined with [`CHUNK_SEPARATOR`].
pub fn combine_chunks(mut chunks: Vec<TemplateChunk>) -> String {
    chunks.sort_by_key(|c| c.order);
    let parts: Vec<&str> = chunks
        .iter()
        .map(|c| c.content.trim())
        .filter(|c| !c.is_empty())
        .collect();
    parts.join(CHUNK_SEPARATOR)
}

#[derive(Debug, Serialize)]
struct UpdateContentRequest<'a> {
    template_content: &'a str,
}

/// HTTP client for the templates backend.
pub struct TemplatesClient {
    http: Client,
    base_url: String,
    request_timeout: Duration,
}

impl TemplatesClient {
    pub fn new(config: &ScribeConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScribeError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Fetch all templates (main entries only, not chunks).
    pub async fn list_templates(&self) -> Result<Vec<TemplateSummary>> {
        let url = format!("{}/api/templates", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let resp = check_status(resp, "list templates").await?;
        Ok(resp.json().await?)
    }

    /// Fetch the ordered chunks of one template.
    pub async fn get_chunks(&self, template_id: &str) -> Result<Vec<TemplateChunk>> {
        let url = format!("{}/api/templates/{template_id}/chunks", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let resp = check_status(resp, "fetch template chunks").await?;
        Ok(resp.json().await?)
    }

    /// Fetch a template's document, assembled per the join rule.
    pub async fn get_content(&self, template_id: &str) -> Result<String> {
        Ok(combine_chunks(self.get_chunks(template_id).await?))
    }

    /// Replace a template's content.
    pub async fn update_content(&self, template_id: &str, content: &str) -> Result<()> {
        let url = format!("{}/api/templates/{template_id}", self.base_url);
        let resp = self
            .http
            .put(&url)
            .timeout(self.request_timeout)
            .json(&UpdateContentRequest {
                template_content: content,
            })
            .send()
            .await?;
        check_status(resp, "update template").await?;
        Ok(())
    }

    /// Resolve a linked reference to its detail record.
    ///
    /// Failures here are side-fetch failures: reported to the caller,
    /// never allowed to touch session state.
    pub async fn get_detail(&self, reference_id: &str) -> Result<DetailRecord> {
        let fetch = async {
            let url = format!("{}/api/prompts/{reference_id}", self.base_url);
            let resp = self
                .http
                .get(&url)
                .timeout(self.request_timeout)
                .send()
                .await?;
            let resp = check_status(resp, "fetch detail").await?;
            let detail: DetailRecord = resp.json().await?;
            Ok::<_, ScribeError>(detail)
        };
        fetch
            .await
            .map_err(|e| ScribeError::SideFetch(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn chunk(order: i64, content: &str) -> TemplateChunk {
        TemplateChunk {
            order,
            content: content.to_string(),
        }
    }

    fn client_for(server: &MockServer) -> TemplatesClient {
        let config = ScribeConfig {
            api_url: server.uri(),
            ..ScribeConfig::default()
        };
        TemplatesClient::new(&config).expect("build client")
    }

    #[test]
    fn test_combine_chunks_orders_trims_and_joins() {
        let combined = combine_chunks(vec![chunk(2, "B"), chunk(1, " A \n")]);
        assert_eq!(combined, "A\n\nB");
    }

    #[test]
    fn test_combine_chunks_drops_empty() {
        let combined = combine_chunks(vec![chunk(1, "A"), chunk(2, "  \n "), chunk(3, "C")]);
        assert_eq!(combined, "A\n\nC");
    }

    #[test]
    fn test_combine_chunks_empty_input() {
        assert_eq!(combine_chunks(vec![]), "");
    }

    #[tokio::test]
    async fn test_list_templates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/templates"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[{
                    "template_id": "t-1",
                    "template_name": "Report",
                    "template_updated": "2025-03-01T12:00:00Z"
                }]"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let templates = client.list_templates().await.expect("list");
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "Report");
    }

    #[tokio::test]
    async fn test_get_content_applies_join_rule() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/templates/t-1/chunks"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[
                    {"template_chunk_order": 2, "template_content": "B"},
                    {"template_chunk_order": 1, "template_content": " A \n"}
                ]"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let content = client.get_content("t-1").await.expect("content");
        assert_eq!(content, "A\n\nB");
    }

    #[tokio::test]
    async fn test_update_content_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/templates/t-1"))
            .and(body_json(
                serde_json::json!({"template_content": "new text"}),
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"{"success": true}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .update_content("t-1", "new text")
            .await
            .expect("update");
    }

    #[tokio::test]
    async fn test_get_detail_failure_is_side_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prompts/p-1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_detail("p-1").await.unwrap_err();
        assert!(matches!(err, ScribeError::SideFetch(_)));
    }

    #[tokio::test]
    async fn test_get_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prompts/p-1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"id": "p-1", "name": "Linked prompt", "description": "d", "content": "c"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let detail = client.get_detail("p-1").await.expect("detail");
        assert_eq!(detail.name, "Linked prompt");
    }
}
