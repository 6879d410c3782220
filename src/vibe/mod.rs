//! Vibe resolution: free-text phrase (or structured slots) to audio-feature
//! targets and genre seeds.
//!
//! Resolution is tiered. The richest path uses externally extracted
//! structured slots, then template matching over the analyzed phrase, and
//! finally the legacy keyword mapper, which always produces something.

pub mod analysis;
pub mod legacy;
pub mod matcher;
pub mod params;
pub mod templates;

pub use matcher::{TemplateIndex, TemplateMatch};
pub use params::TemplateDiagnostics;

use crate::llm::SlotExtractor;
use crate::slots::{is_legacy_phrase, StructuredSlots};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolved feature targets plus genre seeds, ready for the upstream
/// recommendation call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParameterSet {
    /// `target_*` feature keys. BTreeMap keeps serialized output ordered.
    pub targets: BTreeMap<String, f64>,
    /// At most 5 entries, deduplicated, lowercase.
    pub seed_genres: Vec<String>,
}

impl ParameterSet {
    pub fn set_target(&mut self, key: &str, value: f64) {
        self.targets.insert(key.to_string(), value);
    }
}

/// Which resolution tier produced the parameters.
#[derive(Debug)]
pub enum ResolutionOutcome {
    /// Structured slots extracted from the phrase by an LLM.
    Slots {
        params: ParameterSet,
        slots: StructuredSlots,
    },
    /// Template matching over the analyzed phrase.
    Template {
        params: ParameterSet,
        diagnostics: TemplateDiagnostics,
    },
    /// Ordered keyword/emoji presets.
    Legacy { params: ParameterSet },
}

impl ResolutionOutcome {
    pub fn params(&self) -> &ParameterSet {
        match self {
            ResolutionOutcome::Slots { params, .. } => params,
            ResolutionOutcome::Template { params, .. } => params,
            ResolutionOutcome::Legacy { params } => params,
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            ResolutionOutcome::Slots { .. } => "slots",
            ResolutionOutcome::Template { .. } => "template",
            ResolutionOutcome::Legacy { .. } => "legacy",
        }
    }
}

/// The tiered phrase resolver.
pub struct VibeEngine {
    matcher: TemplateIndex,
    extractor: Option<Arc<dyn SlotExtractor>>,
}

impl VibeEngine {
    pub fn new(matcher: TemplateIndex, extractor: Option<Arc<dyn SlotExtractor>>) -> Self {
        Self { matcher, extractor }
    }

    /// Full resolution: slots, then template, then legacy.
    ///
    /// Simple single-keyword phrases skip the slot extractor; the legacy
    /// presets already cover them and the round trip adds nothing.
    pub async fn resolve(&self, phrase: &str, emoji: Option<&str>) -> ResolutionOutcome {
        let trimmed = phrase.trim();
        if !trimmed.is_empty() && !is_legacy_phrase(trimmed) {
            if let Some(extractor) = &self.extractor {
                if let Some(slots) = extractor.extract_slots(trimmed).await {
                    info!(
                        mood = ?slots.mood,
                        confidence = slots.confidence,
                        "Resolved phrase via structured slots"
                    );
                    let params = crate::slots::mapping::slots_to_params(&slots);
                    return ResolutionOutcome::Slots { params, slots };
                }
                debug!("Slot extraction yielded nothing; trying templates");
            }
        }
        self.resolve_lexical(trimmed, emoji).await
    }

    /// Lexical-only resolution: template, then legacy.
    pub async fn resolve_lexical(&self, phrase: &str, emoji: Option<&str>) -> ResolutionOutcome {
        let trimmed = phrase.trim();
        if !trimmed.is_empty() || emoji.is_some() {
            let analysis = analysis::analyse_phrase(trimmed, emoji);
            if let Some(matched) = self.matcher.select(&analysis).await {
                let (params, diagnostics) = params::build_params(&matched, &analysis);
                debug!(
                    template = diagnostics.template_id,
                    score = diagnostics.score,
                    "Resolved phrase via template"
                );
                return ResolutionOutcome::Template {
                    params,
                    diagnostics,
                };
            }
        }
        debug!("Falling back to legacy keyword mapping");
        ResolutionOutcome::Legacy {
            params: legacy::mood_to_params(trimmed, emoji),
        }
    }
}
