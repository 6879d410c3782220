//! Legacy rule mapper: ordered keyword/emoji presets used when template
//! matching cannot resolve a phrase.
//!
//! No scoring here. The first matching substring wins, then an exact emoji
//! preset overrides on top.

use super::ParameterSet;
use crate::spotify::{CatalogService, SpotifyError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct MoodRule {
    keyword: &'static str,
    seed_genres: &'static [&'static str],
    targets: &'static [(&'static str, f64)],
}

// Order matters: scanned top to bottom, first substring hit wins.
const MOOD_RULES: &[MoodRule] = &[
    MoodRule {
        keyword: "focus",
        seed_genres: &["ambient", "chill"],
        targets: &[
            ("target_tempo", 80.0),
            ("target_energy", 0.3),
            ("target_valence", 0.4),
            ("target_instrumentalness", 0.9),
        ],
    },
    MoodRule {
        keyword: "study",
        seed_genres: &["classical", "piano"],
        targets: &[
            ("target_tempo", 70.0),
            ("target_energy", 0.2),
            ("target_valence", 0.5),
            ("target_instrumentalness", 0.95),
        ],
    },
    MoodRule {
        keyword: "chill",
        seed_genres: &["chill", "lo-fi"],
        targets: &[
            ("target_tempo", 85.0),
            ("target_energy", 0.4),
            ("target_valence", 0.6),
        ],
    },
    MoodRule {
        keyword: "lofi",
        seed_genres: &["lo-fi"],
        targets: &[("target_tempo", 75.0), ("target_energy", 0.3)],
    },
    MoodRule {
        keyword: "happy",
        seed_genres: &["dance", "pop"],
        targets: &[
            ("target_tempo", 125.0),
            ("target_energy", 0.8),
            ("target_valence", 0.9),
        ],
    },
    MoodRule {
        keyword: "sad",
        seed_genres: &["acoustic", "indie"],
        targets: &[
            ("target_tempo", 90.0),
            ("target_energy", 0.3),
            ("target_valence", 0.2),
        ],
    },
    MoodRule {
        keyword: "angry",
        seed_genres: &["metal", "rock"],
        targets: &[
            ("target_tempo", 150.0),
            ("target_energy", 0.95),
            ("target_valence", 0.2),
        ],
    },
    MoodRule {
        keyword: "romantic",
        seed_genres: &["r-n-b", "soul"],
        targets: &[
            ("target_tempo", 95.0),
            ("target_energy", 0.5),
            ("target_valence", 0.8),
        ],
    },
    MoodRule {
        keyword: "workout",
        seed_genres: &["edm", "hip-hop"],
        targets: &[
            ("target_tempo", 135.0),
            ("target_energy", 0.9),
            ("target_valence", 0.7),
        ],
    },
    MoodRule {
        keyword: "party",
        seed_genres: &["dance", "house"],
        targets: &[
            ("target_tempo", 128.0),
            ("target_energy", 0.9),
            ("target_valence", 0.9),
        ],
    },
];

const EMOJI_RULES: &[MoodRule] = &[
    MoodRule {
        keyword: "😊",
        seed_genres: &["pop"],
        targets: &[
            ("target_tempo", 120.0),
            ("target_energy", 0.8),
            ("target_valence", 0.9),
        ],
    },
    MoodRule {
        keyword: "😢",
        seed_genres: &["acoustic"],
        targets: &[
            ("target_tempo", 85.0),
            ("target_energy", 0.3),
            ("target_valence", 0.2),
        ],
    },
    MoodRule {
        keyword: "😤",
        seed_genres: &["metal"],
        targets: &[
            ("target_tempo", 150.0),
            ("target_energy", 0.95),
            ("target_valence", 0.2),
        ],
    },
    MoodRule {
        keyword: "❤️",
        seed_genres: &["r-n-b"],
        targets: &[
            ("target_tempo", 95.0),
            ("target_energy", 0.5),
            ("target_valence", 0.8),
        ],
    },
    MoodRule {
        keyword: "🧘",
        seed_genres: &["ambient"],
        targets: &[
            ("target_tempo", 70.0),
            ("target_energy", 0.2),
            ("target_valence", 0.5),
            ("target_instrumentalness", 0.9),
        ],
    },
    MoodRule {
        keyword: "🏋️",
        seed_genres: &["edm"],
        targets: &[
            ("target_tempo", 135.0),
            ("target_energy", 0.9),
            ("target_valence", 0.7),
        ],
    },
];

/// Unknown seeds coerced to a close valid genre before being dropped.
const SEED_ALIASES: &[(&str, &str)] = &[
    ("lo-fi", "chill"),
    ("lofi", "chill"),
    ("workout", "work-out"),
];

/// Map a phrase (and optional emoji) to parameters by ordered keyword scan.
///
/// Always produces a usable set: with no rule hit, the defaults apply.
pub fn mood_to_params(phrase: &str, emoji: Option<&str>) -> ParameterSet {
    let text = phrase.trim().to_lowercase();

    let mut params = ParameterSet::default();
    params.set_target("target_tempo", 110.0);
    params.set_target("target_energy", 0.6);
    params.set_target("target_valence", 0.6);
    params.seed_genres = vec!["pop".to_string()];

    for rule in MOOD_RULES {
        if text.contains(rule.keyword) {
            apply_rule(&mut params, rule);
            break;
        }
    }

    if let Some(glyph) = emoji {
        let glyph = glyph.trim();
        if let Some(rule) = EMOJI_RULES.iter().find(|r| r.keyword == glyph) {
            apply_rule(&mut params, rule);
        }
    }

    params
}

fn apply_rule(params: &mut ParameterSet, rule: &MoodRule) {
    for (key, value) in rule.targets {
        params.set_target(key, *value);
    }
    params.seed_genres = rule.seed_genres.iter().map(|s| s.to_string()).collect();
}

/// Normalize seed genres against the provider's known-valid set.
///
/// Unknown seeds go through the alias table, then are dropped. When no
/// valid set is available the input passes through untouched, and an empty
/// result always falls back to `["pop"]`.
pub fn normalize_seed_genres(seeds: &[String], valid: Option<&HashSet<String>>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for seed in seeds {
        let key = seed.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        let resolved = match valid {
            None => Some(key.clone()),
            Some(valid) if valid.contains(&key) => Some(key.clone()),
            Some(valid) => SEED_ALIASES
                .iter()
                .find(|(from, _)| *from == key)
                .map(|(_, to)| to.to_string())
                .filter(|alias| valid.contains(alias)),
        };
        if let Some(resolved) = resolved {
            if !normalized.contains(&resolved) {
                normalized.push(resolved);
            }
        } else {
            debug!(seed = %key, "Dropping unknown seed genre");
        }
    }
    if normalized.is_empty() {
        normalized.push("pop".to_string());
    }
    normalized.truncate(5);
    normalized
}

const GENRE_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Hour-scale cache over the provider's available genre seeds.
pub struct GenreSeedCache {
    service: Arc<dyn CatalogService>,
    state: Mutex<Option<(HashSet<String>, Instant)>>,
}

impl GenreSeedCache {
    pub fn new(service: Arc<dyn CatalogService>) -> Self {
        Self {
            service,
            state: Mutex::new(None),
        }
    }

    /// Fetch the valid seed set, reusing a cached copy within the TTL.
    ///
    /// Returns `None` when the provider cannot supply the set; callers then
    /// skip normalization rather than dropping every seed.
    pub async fn valid_seeds(&self) -> Option<HashSet<String>> {
        let mut state = self.state.lock().await;
        if let Some((seeds, fetched_at)) = state.as_ref() {
            if fetched_at.elapsed() < GENRE_CACHE_TTL {
                return Some(seeds.clone());
            }
        }
        match self.service.available_genre_seeds().await {
            Ok(seeds) if !seeds.is_empty() => {
                debug!(count = seeds.len(), "Refreshed genre seed cache");
                *state = Some((seeds.clone(), Instant::now()));
                Some(seeds)
            }
            Ok(_) => {
                warn!("Provider returned an empty genre seed list");
                None
            }
            Err(SpotifyError::NotConfigured) => None,
            Err(e) => {
                warn!(error = %e, "Failed to fetch genre seeds");
                // Serve a stale copy over nothing.
                state.as_ref().map(|(seeds, _)| seeds.clone())
            }
        }
    }
}
