//! Template matching: lexical tag overlap blended with optional semantic
//! embedding similarity.
//!
//! The embedding cache is a best-effort accelerator. It is loaded lazily
//! from disk once per process, appended when templates lack vectors, and
//! persisted back; read/write failures are logged and ignored.

use super::analysis::Analysis;
use super::templates::{VibeTemplate, VIBE_TEMPLATES};
use crate::llm::EmbeddingProvider;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const EMBEDDING_WEIGHT: f64 = 0.55;
const LEXICAL_WEIGHT: f64 = 0.45;

/// The single best template for a phrase, with scoring diagnostics.
#[derive(Debug, Clone)]
pub struct TemplateMatch {
    pub template: &'static VibeTemplate,
    /// Combined score in [0, 1.2].
    pub score: f64,
    pub lexical_overlap: usize,
    pub embedding_used: bool,
}

#[derive(Default)]
struct CacheState {
    loaded: bool,
    vectors: HashMap<String, Vec<f32>>,
}

/// Scores every template against an analyzed phrase.
pub struct TemplateIndex {
    templates: &'static [VibeTemplate],
    provider: Option<Arc<dyn EmbeddingProvider>>,
    cache_path: Option<PathBuf>,
    state: Mutex<CacheState>,
}

impl TemplateIndex {
    pub fn new(
        provider: Option<Arc<dyn EmbeddingProvider>>,
        cache_path: Option<PathBuf>,
    ) -> Self {
        Self {
            templates: VIBE_TEMPLATES,
            provider,
            cache_path,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn build_embedding_text(template: &VibeTemplate) -> String {
        format!(
            "{}. {}. Tags: {}. Genres: {}.",
            template.title,
            template.description,
            template.tags.join(", "),
            template.seed_genres.join(", ")
        )
    }

    fn load_cache(&self, state: &mut CacheState) {
        if state.loaded {
            return;
        }
        state.loaded = true;
        let Some(path) = &self.cache_path else {
            return;
        };
        if !path.exists() {
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, Vec<f32>>>(&raw) {
                Ok(vectors) => {
                    debug!(count = vectors.len(), "Loaded template embedding cache");
                    state.vectors = vectors;
                }
                Err(e) => warn!(error = %e, "Template embedding cache is malformed"),
            },
            Err(e) => warn!(error = %e, "Failed to read template embedding cache"),
        }
    }

    fn save_cache(&self, state: &CacheState) {
        if state.vectors.is_empty() {
            return;
        }
        let Some(path) = &self.cache_path else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(error = %e, "Failed to create embedding cache directory");
                return;
            }
        }
        match serde_json::to_string(&state.vectors) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(path, raw) {
                    warn!(error = %e, "Failed to persist template embedding cache");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize template embedding cache"),
        }
    }

    async fn ensure_embeddings(&self, state: &mut CacheState) {
        self.load_cache(state);

        let Some(provider) = &self.provider else {
            return;
        };
        let missing: Vec<&VibeTemplate> = self
            .templates
            .iter()
            .filter(|t| !state.vectors.contains_key(t.id))
            .collect();
        if missing.is_empty() {
            return;
        }

        let payloads: Vec<String> = missing.iter().map(|t| Self::build_embedding_text(t)).collect();
        let Some(vectors) = provider.embed(&payloads).await else {
            info!("Embedding lookup unavailable; continuing with lexical scoring only");
            return;
        };

        for (template, vector) in missing.iter().zip(vectors) {
            if !vector.is_empty() {
                state.vectors.insert(template.id.to_string(), vector);
            }
        }
        self.save_cache(state);
    }

    async fn embed_phrase(&self, phrase: &str) -> Option<Vec<f32>> {
        if phrase.is_empty() {
            return None;
        }
        let provider = self.provider.as_ref()?;
        let vectors = provider.embed(&[phrase.to_string()]).await?;
        vectors.into_iter().next().filter(|v| !v.is_empty())
    }

    /// Select the highest-scoring template for an analysis.
    ///
    /// Returns `None` only for an empty catalog; ties go to the first
    /// template seen, and iteration order over the catalog is stable.
    pub async fn select(&self, analysis: &Analysis) -> Option<TemplateMatch> {
        let mut state = self.state.lock().await;
        self.ensure_embeddings(&mut state).await;

        let query_embedding = if state.vectors.is_empty() {
            None
        } else {
            self.embed_phrase(&analysis.normalized_text).await
        };
        let embedding_available = query_embedding.is_some();

        let mut best: Option<TemplateMatch> = None;
        for template in self.templates {
            let overlap = template
                .tags
                .iter()
                .filter(|tag| analysis.keywords.contains(**tag))
                .count();
            // The floor of 4 keeps tiny tag sets from trivially maxing out.
            let lexical = (overlap as f64 / 4.0_f64.max(template.tags.len() as f64)).clamp(0.0, 1.0);

            let embed_score = match (&query_embedding, state.vectors.get(template.id)) {
                (Some(query), Some(vector)) => cosine_similarity(query, vector),
                _ => None,
            };

            let mut combined = match embed_score {
                Some(cosine) => cosine * EMBEDDING_WEIGHT + lexical * LEXICAL_WEIGHT,
                None => lexical,
            };
            if overlap >= 3 {
                combined += 0.1;
            } else if overlap == 2 {
                combined += 0.05;
            }
            combined = combined.clamp(0.0, 1.2);

            let beats_best = best.as_ref().map(|b| combined > b.score).unwrap_or(true);
            if beats_best {
                best = Some(TemplateMatch {
                    template,
                    score: combined,
                    lexical_overlap: overlap,
                    embedding_used: embedding_available && embed_score.is_some(),
                });
            }
        }
        best
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return None;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (av, bv) in a.iter().zip(b) {
        dot += *av as f64 * *bv as f64;
        norm_a += (*av as f64).powi(2);
        norm_b += (*bv as f64).powi(2);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
