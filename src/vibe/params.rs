//! Parameter builder: template baseline + biases + keyword micro-rules.

use super::analysis::{seed_expansions_for, Analysis};
use super::matcher::TemplateMatch;
use super::ParameterSet;
use serde::Serialize;

const DEFAULT_TARGETS: &[(&str, f64)] = &[
    ("target_energy", 0.6),
    ("target_valence", 0.55),
    ("target_tempo", 112.0),
    ("target_danceability", 0.58),
];

/// Scoring details surfaced alongside a template-derived parameter set.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateDiagnostics {
    pub template_id: String,
    pub template_title: String,
    pub score: f64,
    pub lexical_overlap: usize,
    pub embedding_used: bool,
    /// Sorted, capped at 40 entries.
    pub keywords: Vec<String>,
    pub energy_bias: f64,
    pub tempo_bias: f64,
    pub valence_bias: f64,
}

fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.clamp(lo, hi)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn expand_seeds(base: &[&str], analysis: &Analysis) -> Vec<String> {
    let mut seeds: Vec<String> = Vec::new();
    let mut push_unique = |seed: &str, seeds: &mut Vec<String>| {
        let key = seed.trim().to_lowercase();
        if !key.is_empty() && !seeds.contains(&key) {
            seeds.push(key);
        }
    };
    for seed in base {
        push_unique(seed, &mut seeds);
    }
    // Sorted iteration keeps expansion order stable across runs.
    let mut keywords: Vec<&String> = analysis.keywords.iter().collect();
    keywords.sort();
    for keyword in keywords {
        if let Some(extras) = seed_expansions_for(keyword) {
            for seed in extras {
                push_unique(seed, &mut seeds);
            }
        }
    }
    seeds
}

/// Build the final parameter set for a matched template.
///
/// Merge order: global defaults, template baseline, analysis biases, then
/// the keyword micro-rules. Each adjustment is clamped independently so a
/// later rule can partially offset an earlier one on a shared key.
pub fn build_params(matched: &TemplateMatch, analysis: &Analysis) -> (ParameterSet, TemplateDiagnostics) {
    let mut params = ParameterSet::default();
    for (key, value) in DEFAULT_TARGETS {
        params.set_target(key, *value);
    }
    for (key, value) in matched.template.targets {
        params.set_target(key, *value);
    }

    let mut seeds = expand_seeds(matched.template.seed_genres, analysis);
    seeds.truncate(5);
    params.seed_genres = seeds;

    let get = |params: &ParameterSet, key: &str, default: f64| {
        params.targets.get(key).copied().unwrap_or(default)
    };

    params.set_target(
        "target_energy",
        clamp(get(&params, "target_energy", 0.6) + analysis.energy_bias, 0.05, 0.95),
    );
    params.set_target(
        "target_tempo",
        clamp(get(&params, "target_tempo", 112.0) + analysis.tempo_bias, 55.0, 150.0),
    );
    params.set_target(
        "target_valence",
        clamp(get(&params, "target_valence", 0.55) + analysis.valence_bias, 0.05, 0.95),
    );

    let has = |key: &str| analysis.keywords.contains(key);

    if has("sunset") {
        params.set_target(
            "target_energy",
            clamp(get(&params, "target_energy", 0.6) - 0.05, 0.05, 0.95),
        );
        params.set_target(
            "target_tempo",
            clamp(get(&params, "target_tempo", 110.0) - 4.0, 55.0, 150.0),
        );
    }
    if has("sunrise") || has("morning") {
        params.set_target(
            "target_valence",
            clamp(get(&params, "target_valence", 0.6) + 0.06, 0.05, 0.95),
        );
    }
    if has("night") || has("late-night") {
        params.set_target(
            "target_valence",
            clamp(get(&params, "target_valence", 0.6) - 0.05, 0.05, 0.95),
        );
    }
    if has("storm") || has("dark") {
        params.set_target(
            "target_valence",
            clamp(get(&params, "target_valence", 0.6) - 0.12, 0.05, 0.95),
        );
        params.set_target(
            "target_energy",
            clamp(get(&params, "target_energy", 0.6) + 0.04, 0.05, 0.95),
        );
    }
    if has("sleep") || has("meditation") {
        params.set_target(
            "target_energy",
            clamp(get(&params, "target_energy", 0.6) - 0.2, 0.05, 0.95),
        );
        params.set_target(
            "target_tempo",
            clamp(get(&params, "target_tempo", 110.0) - 12.0, 40.0, 120.0),
        );
    }
    if has("workout") || has("run") {
        params.set_target(
            "target_energy",
            clamp(get(&params, "target_energy", 0.6) + 0.12, 0.05, 0.95),
        );
        params.set_target(
            "target_tempo",
            clamp(get(&params, "target_tempo", 110.0) + 10.0, 55.0, 180.0),
        );
    }
    if has("study") || has("focus") || has("coding") {
        params.set_target(
            "target_instrumentalness",
            clamp(get(&params, "target_instrumentalness", 0.5) + 0.3, 0.0, 1.0),
        );
        params.set_target(
            "target_energy",
            clamp(get(&params, "target_energy", 0.6) - 0.08, 0.05, 0.95),
        );
    }

    let mut keywords: Vec<String> = analysis.keywords.iter().cloned().collect();
    keywords.sort();
    keywords.truncate(40);

    let diagnostics = TemplateDiagnostics {
        template_id: matched.template.id.to_string(),
        template_title: matched.template.title.to_string(),
        score: round4(matched.score),
        lexical_overlap: matched.lexical_overlap,
        embedding_used: matched.embedding_used,
        keywords,
        energy_bias: round4(analysis.energy_bias),
        tempo_bias: round4(analysis.tempo_bias),
        valence_bias: round4(analysis.valence_bias),
    };

    (params, diagnostics)
}
