//! Capability-optional LLM surface.
//!
//! Both capabilities may be absent (no API key configured) or fail at any
//! time; callers must always have a fallback branch for `None`.

mod openai;

pub use openai::{OpenAiClient, OpenAiConfig};

use crate::slots::StructuredSlots;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from an LLM backend. These never escape the trait surface; the
/// implementations log and degrade to `None`.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Extracts structured vibe slots from a free-text phrase.
#[async_trait]
pub trait SlotExtractor: Send + Sync {
    /// Returns `None` when the capability is unconfigured, the call fails,
    /// or the payload does not validate.
    async fn extract_slots(&self, phrase: &str) -> Option<StructuredSlots>;
}

/// Produces embedding vectors for a batch of texts.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns one vector per input text, or `None` on any failure. A count
    /// mismatch with the input is tolerated by callers.
    async fn embed(&self, texts: &[String]) -> Option<Vec<Vec<f32>>>;
}
