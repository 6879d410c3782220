//! OpenAI-compatible client for slot extraction and embeddings.
//!
//! Works with any service implementing the OpenAI chat completions and
//! embeddings APIs. Every failure path degrades to `None`.

use super::{EmbeddingProvider, LlmError, SlotExtractor};
use crate::slots::{RawSlots, StructuredSlots};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const SYSTEM_MESSAGE: &str = "You convert free-text music requests into a JSON object matching the provided schema. \
Output ONLY JSON. Use these enumerations exactly: \
mood in ['romantic','melancholic','happy','energetic','calm','dark','nostalgic','confident','angry','hopeful','bittersweet']; \
activity in ['coding','studying','party','dinner','workout','drive','sleep','focus','relax','run','dance']; \
time_of_day in ['morning','afternoon','sunset','evening','late_night','none']. \
When the phrase suggests something outside the list, choose the closest supported value (e.g., jiujitsu -> workout). \
Include 1-3 style_hints if useful, prefer ISO language codes for language_or_locale. Be conservative with confidence.";

/// Few-shot pairs anchoring the output shape.
fn few_shot_pairs() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        (
            "romantic date in paris at sunset, a bit classy",
            json!({
                "mood": "romantic",
                "activity": "dinner",
                "time_of_day": "sunset",
                "place": "paris",
                "era": null,
                "intensity": 3,
                "style_hints": ["jazz", "chanson"],
                "language_or_locale": "fr",
                "confidence": 0.82
            }),
        ),
        (
            "late night coding, need deep focus, no lyrics",
            json!({
                "mood": "calm",
                "activity": "coding",
                "time_of_day": "late_night",
                "place": null,
                "era": null,
                "intensity": 2,
                "style_hints": ["lo-fi", "ambient", "minimal"],
                "language_or_locale": "en",
                "confidence": 0.87
            }),
        ),
        (
            "late night jiujitsu drilling session",
            json!({
                "mood": "energetic",
                "activity": "workout",
                "time_of_day": "late_night",
                "place": "dojo",
                "era": null,
                "intensity": 4,
                "style_hints": ["electronic", "hip-hop"],
                "language_or_locale": "en",
                "confidence": 0.78
            }),
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
}

impl OpenAiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

/// OpenAI-compatible API client.
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: 0.1,
            max_tokens: 300,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("empty completion text".to_string()))
    }

    async fn embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/embeddings", self.config.base_url);
        let request = EmbeddingsRequest {
            model: self.config.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl SlotExtractor for OpenAiClient {
    async fn extract_slots(&self, phrase: &str) -> Option<StructuredSlots> {
        let mut messages = vec![ChatMessage::system(SYSTEM_MESSAGE)];
        for (input, output) in few_shot_pairs() {
            messages.push(ChatMessage::user(input));
            messages.push(ChatMessage::assistant(&output.to_string()));
        }
        messages.push(ChatMessage::user(phrase));

        let text = match self.chat_completion(messages).await {
            Ok(text) => text,
            Err(e) => {
                warn!(phrase = %phrase, error = %e, "Slot extraction call failed");
                return None;
            }
        };

        let json_text = extract_json(&text)?;
        let raw: RawSlots = match serde_json::from_str(&json_text) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Slot payload is not valid JSON");
                return None;
            }
        };

        let slots = StructuredSlots::from_raw(raw);
        if slots.is_none() {
            warn!(phrase = %phrase, "Slot payload failed validation");
        }
        slots
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, texts: &[String]) -> Option<Vec<Vec<f32>>> {
        let cleaned: Vec<String> = texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect();
        if cleaned.is_empty() {
            return None;
        }

        match self.embeddings(&cleaned).await {
            Ok(vectors) => {
                if vectors.len() != cleaned.len() {
                    warn!(
                        requested = cleaned.len(),
                        received = vectors.len(),
                        "Embedding response count mismatch"
                    );
                }
                debug!(count = vectors.len(), "Fetched embeddings");
                Some(vectors)
            }
            Err(e) => {
                warn!(error = %e, "Embeddings request failed");
                None
            }
        }
    }
}

/// Find a JSON object in response text, handling markdown code fences.
fn extract_json(text: &str) -> Option<String> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].trim().to_string())
}

// Wire types

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }
    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
    fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_markdown_fence() {
        let text = "Here you go:\n```json\n{\"mood\": \"happy\", \"confidence\": 0.8}\n```\nEnjoy!";
        let json = extract_json(text).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.contains("\"mood\""));
    }

    #[test]
    fn test_extract_json_raw_object() {
        let text = "{\"mood\": \"calm\", \"confidence\": 0.7}";
        assert_eq!(extract_json(text).unwrap(), text);
    }

    #[test]
    fn test_extract_json_none_when_absent() {
        assert!(extract_json("no json here").is_none());
        assert!(extract_json("} backwards {").is_none());
    }

    #[test]
    fn test_extracted_payload_validates() {
        let text = "```json\n{\"mood\": \"romantic\", \"activity\": \"dinner\", \"intensity\": 4, \"confidence\": 0.9}\n```";
        let raw: RawSlots = serde_json::from_str(&extract_json(text).unwrap()).unwrap();
        let slots = StructuredSlots::from_raw(raw).unwrap();
        assert_eq!(slots.intensity, 4);
    }
}
