//! Wire types for the templates collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A template as returned by the list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSummary {
    #[serde(rename = "template_id")]
    pub id: String,
    #[serde(rename = "template_name")]
    pub name: String,
    #[serde(rename = "template_updated")]
    pub updated_at: DateTime<Utc>,
    /// Reference to a linked prompt, resolvable via the detail lookup.
    /// The backend sends an empty string when none is linked.
    #[serde(rename = "linked_prompt_id", default)]
    pub linked_prompt: String,
}

impl TemplateSummary {
    /// The linked prompt reference, if one is set.
    pub fn linked_ref(&self) -> Option<&str> {
        if self.linked_prompt.is_empty() {
            None
        } else {
            Some(&self.linked_prompt)
        }
    }
}

/// One stored fragment of a template's document.
///
/// Chunks are concatenated by ascending order to form the full content; the
/// join rule lives in the engine's templates client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateChunk {
    #[serde(rename = "template_chunk_order")]
    pub order: i64,
    #[serde(rename = "template_content")]
    pub content: String,
}

/// Secondary detail content resolved from a turn's linked reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}
