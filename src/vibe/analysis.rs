//! Phrase analysis: tokenization, keyword expansion and bias scoring.
//!
//! Keyword tables are plain immutable data; lookups are linear scans over
//! small slices, which is cheaper than hashing at these sizes.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[a-z0-9']+").unwrap();
}

/// Single-token aliases: seeing the key unions in the expansion keywords.
const KEYWORD_ALIASES: &[(&str, &[&str])] = &[
    ("madagascar", &["madagascar", "malagasy", "lemur", "safari", "africa"]),
    ("safari", &["safari", "wildlife", "savanna", "adventure", "africa"]),
    ("savanna", &["safari", "savanna", "grassland"]),
    ("hiit", &["hiit", "intense", "workout"]),
    ("afrobeats", &["afrobeat"]),
    ("focus", &["focus", "concentration", "study"]),
    ("coding", &["coding", "programming", "focus"]),
    ("rainy", &["rainy", "rain", "storm"]),
    ("storm", &["storm", "dramatic", "dark"]),
    ("sunset", &["sunset", "golden-hour"]),
    ("sunrise", &["sunrise", "dawn", "morning"]),
    ("night", &["night", "late-night", "midnight"]),
    ("party", &["party", "celebration", "dance"]),
    ("festival", &["festival", "party", "celebration"]),
    ("yoga", &["yoga", "meditation", "calm"]),
    ("chill", &["chill", "relax", "calm"]),
    ("study", &["study", "focus", "reading"]),
    ("beach", &["beach", "tropical", "ocean"]),
    ("roadtrip", &["roadtrip", "road-trip", "drive"]),
    ("drive", &["drive", "roadtrip", "night-drive"]),
    ("caribbean", &["caribbean", "island"]),
    ("brazil", &["brazil", "rio"]),
    ("samba", &["samba", "brazil"]),
    ("techno", &["techno", "club"]),
    ("hiphop", &["hip-hop", "rap"]),
];

/// Multi-word triggers matched as substrings of the normalized phrase.
const PHRASE_KEYWORDS: &[(&str, &[&str])] = &[
    ("madagascar", &["madagascar", "safari", "wildlife"]),
    ("indian ocean", &["madagascar", "island"]),
    ("safari", &["safari", "wildlife", "savanna"]),
    ("savanna", &["savanna", "wildlife"]),
    ("coding session", &["coding", "focus"]),
    ("night market", &["market", "street-food", "night"]),
    ("street food", &["market", "street-food"]),
    ("dance party", &["dance", "party"]),
    ("road trip", &["roadtrip", "drive"]),
    ("late night", &["night", "late-night"]),
    ("sunrise", &["sunrise", "morning"]),
    ("sunset", &["sunset", "evening"]),
    ("festival", &["festival", "party"]),
    ("boxing gym", &["boxing", "gym"]),
    ("yoga class", &["yoga", "calm"]),
    ("camp fire", &["campfire"]),
    ("campfire", &["campfire"]),
];

const EMOJI_KEYWORDS: &[(&str, &[&str])] = &[
    ("🔥", &["intense", "energetic", "party"]),
    ("🦁", &["safari", "wildlife", "africa"]),
    ("🐆", &["safari", "wildlife"]),
    ("🏝️", &["beach", "tropical"]),
    ("🌅", &["sunrise", "sunset"]),
    ("🌇", &["sunset", "city"]),
    ("🌃", &["night", "city"]),
    ("🌧️", &["rainy", "storm"]),
    ("☕", &["coffee", "cozy"]),
    ("💤", &["sleep", "calm"]),
    ("🧘", &["yoga", "meditation"]),
    ("💪", &["workout", "gym"]),
    ("🎉", &["party", "celebration"]),
    ("🏕️", &["campfire", "outdoor"]),
];

const HIGH_ENERGY: &[&str] = &[
    "intense", "energetic", "hype", "powerful", "aggressive", "hiit", "workout", "party",
    "festival", "dance",
];
const LOW_ENERGY: &[&str] = &[
    "calm", "chill", "relax", "soothing", "sleep", "wind-down", "ambient", "meditation",
];
const POSITIVE_VALENCE: &[&str] = &["happy", "joyful", "uplifting", "hopeful", "sunny", "gratitude"];
const NEGATIVE_VALENCE: &[&str] = &["dark", "moody", "storm", "melancholy", "sad"];
const FASTER_TEMPO: &[&str] = &[
    "running", "race", "hiit", "workout", "party", "dance", "energetic", "intense",
];
const SLOWER_TEMPO: &[&str] = &["sleep", "calm", "meditation", "chill", "sunset", "late-night"];

/// Per-request analysis of a mood phrase.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub normalized_text: String,
    pub tokens: Vec<String>,
    /// Superset of the tokens after alias/phrase/emoji expansion.
    pub keywords: HashSet<String>,
    pub energy_bias: f64,
    pub tempo_bias: f64,
    pub valence_bias: f64,
    pub emoji: Option<String>,
}

fn lookup<'a>(table: &'a [(&str, &'a [&'a str])], key: &str) -> Option<&'a [&'a str]> {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, expansions)| *expansions)
}

fn extend_keywords(keywords: &mut HashSet<String>, additions: &[&str]) {
    for value in additions {
        let cleaned = value.trim().to_lowercase();
        if !cleaned.is_empty() {
            keywords.insert(cleaned);
        }
    }
}

/// Analyze a phrase and optional emoji into keywords and bias scalars.
///
/// Always returns a value; an empty phrase yields an empty keyword set and
/// zero biases.
pub fn analyse_phrase(phrase: &str, emoji: Option<&str>) -> Analysis {
    let normalized_text = phrase.trim().to_lowercase();
    let tokens: Vec<String> = TOKEN_RE
        .find_iter(&normalized_text)
        .map(|m| m.as_str().to_string())
        .collect();

    let mut keywords: HashSet<String> = tokens.iter().cloned().collect();

    for token in tokens.iter() {
        if let Some(extras) = lookup(KEYWORD_ALIASES, token) {
            extend_keywords(&mut keywords, extras);
        }
    }

    for (trigger, extras) in PHRASE_KEYWORDS {
        if normalized_text.contains(trigger) {
            extend_keywords(&mut keywords, extras);
        }
    }

    if let Some(glyph) = emoji {
        if let Some(extras) = lookup(EMOJI_KEYWORDS, glyph) {
            extend_keywords(&mut keywords, extras);
        }
    }

    let mut energy_bias = 0.0;
    let mut tempo_bias = 0.0;
    let mut valence_bias = 0.0;

    for keyword in &keywords {
        let keyword = keyword.as_str();
        if HIGH_ENERGY.contains(&keyword) {
            energy_bias += 0.12;
            tempo_bias += 6.0;
        }
        if LOW_ENERGY.contains(&keyword) {
            energy_bias -= 0.12;
            tempo_bias -= 6.0;
        }
        if FASTER_TEMPO.contains(&keyword) {
            tempo_bias += 8.0;
        }
        if SLOWER_TEMPO.contains(&keyword) {
            tempo_bias -= 8.0;
        }
        if POSITIVE_VALENCE.contains(&keyword) {
            valence_bias += 0.08;
        }
        if NEGATIVE_VALENCE.contains(&keyword) {
            valence_bias -= 0.12;
        }
    }

    Analysis {
        normalized_text,
        tokens,
        keywords,
        energy_bias,
        tempo_bias,
        valence_bias,
        emoji: emoji.map(|e| e.to_string()),
    }
}

/// Seed genres appended when the keyword is present in the analyzed set.
pub const KEYWORD_SEED_EXPANSIONS: &[(&str, &[&str])] = &[
    ("africa", &["afrobeat", "world-music"]),
    ("madagascar", &["afrobeat", "world-music"]),
    ("safari", &["afrobeat", "world-music"]),
    ("latin", &["latin", "dance"]),
    ("caribbean", &["dancehall", "latin"]),
    ("brazil", &["samba", "mpb"]),
    ("rio", &["samba", "mpb"]),
    ("yoga", &["new-age", "ambient"]),
    ("sleep", &["sleep", "ambient"]),
    ("focus", &["chill", "study"]),
    ("coding", &["minimal-techno", "ambient"]),
    ("party", &["dance", "edm"]),
    ("festival", &["dance", "edm"]),
    ("rainy", &["rainy-day", "indie"]),
    ("storm", &["movies", "classical"]),
    ("campfire", &["acoustic", "folk"]),
];

pub fn seed_expansions_for(keyword: &str) -> Option<&'static [&'static str]> {
    KEYWORD_SEED_EXPANSIONS
        .iter()
        .find(|(k, _)| *k == keyword)
        .map(|(_, seeds)| *seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_phrase_yields_zero_biases() {
        let analysis = analyse_phrase("", None);
        assert!(analysis.keywords.is_empty());
        assert_eq!(analysis.energy_bias, 0.0);
        assert_eq!(analysis.tempo_bias, 0.0);
        assert_eq!(analysis.valence_bias, 0.0);
    }

    #[test]
    fn test_safari_phrase_expands_to_africa() {
        let analysis = analyse_phrase("safari adventure in madagascar", None);
        assert!(analysis.keywords.contains("africa"));
        assert!(analysis.keywords.contains("wildlife"));
        assert!(analysis.keywords.contains("savanna"));
        assert!(analysis.tokens.contains(&"safari".to_string()));
    }

    #[test]
    fn test_phrase_trigger_matches_substring() {
        let analysis = analyse_phrase("an endless road trip playlist", None);
        assert!(analysis.keywords.contains("roadtrip"));
        assert!(analysis.keywords.contains("drive"));
    }

    #[test]
    fn test_emoji_expansion() {
        let analysis = analyse_phrase("", Some("🧘"));
        assert!(analysis.keywords.contains("meditation"));
        assert!(analysis.energy_bias < 0.0);
    }

    #[test]
    fn test_workout_biases_push_energy_and_tempo_up() {
        let analysis = analyse_phrase("hiit workout", None);
        // "hiit" expands to "intense" as well, so several high-energy hits.
        assert!(analysis.energy_bias >= 0.24);
        assert!(analysis.tempo_bias > 0.0);
    }

    #[test]
    fn test_sad_phrase_lowers_valence() {
        let analysis = analyse_phrase("dark and moody storm", None);
        assert!(analysis.valence_bias < 0.0);
    }

    #[test]
    fn test_tokenizer_keeps_alphanumerics_only() {
        let analysis = analyse_phrase("Late-Night! Drive 2024", None);
        assert_eq!(analysis.tokens, vec!["late", "night", "drive", "2024"]);
    }
}
