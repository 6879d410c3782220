//! The vibe template catalog.
//!
//! Templates are pre-authored archetypes used for lexical/semantic matching
//! against a phrase. Defined at process start, never mutated.

/// An immutable vibe archetype.
#[derive(Debug)]
pub struct VibeTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Lowercase tags matched against the analyzed keyword set.
    pub tags: &'static [&'static str],
    /// Feature baseline overlaid on the global defaults.
    pub targets: &'static [(&'static str, f64)],
    /// Ordered, deduplicated seed genres.
    pub seed_genres: &'static [&'static str],
}

pub const VIBE_TEMPLATES: &[VibeTemplate] = &[
    VibeTemplate {
        id: "afro_safari_adventure",
        title: "Safari Sunrise",
        description: "Wide-open savanna energy with African rhythms and wanderlust.",
        tags: &["safari", "wildlife", "savanna", "africa", "adventure", "madagascar"],
        targets: &[
            ("target_energy", 0.68),
            ("target_valence", 0.72),
            ("target_tempo", 114.0),
            ("target_danceability", 0.66),
        ],
        seed_genres: &["afrobeat", "world-music", "dance"],
    },
    VibeTemplate {
        id: "golden_hour_chill",
        title: "Golden Hour",
        description: "Warm, unhurried tracks for watching the sun go down.",
        tags: &["sunset", "golden-hour", "evening", "chill", "relax", "warm"],
        targets: &[
            ("target_energy", 0.45),
            ("target_valence", 0.65),
            ("target_tempo", 96.0),
            ("target_acousticness", 0.55),
        ],
        seed_genres: &["chill", "indie-pop", "acoustic"],
    },
    VibeTemplate {
        id: "deep_focus_flow",
        title: "Deep Focus",
        description: "Instrumental textures for studying, coding and concentration.",
        tags: &["focus", "study", "coding", "concentration", "reading", "work"],
        targets: &[
            ("target_energy", 0.35),
            ("target_valence", 0.5),
            ("target_tempo", 85.0),
            ("target_instrumentalness", 0.85),
        ],
        seed_genres: &["ambient", "minimal-techno", "study"],
    },
    VibeTemplate {
        id: "sweat_session",
        title: "Sweat Session",
        description: "Relentless peaks for the gym, HIIT circuits and sprints.",
        tags: &["workout", "gym", "hiit", "running", "intense", "boxing"],
        targets: &[
            ("target_energy", 0.9),
            ("target_valence", 0.65),
            ("target_tempo", 140.0),
            ("target_danceability", 0.7),
        ],
        seed_genres: &["work-out", "edm", "hip-hop"],
    },
    VibeTemplate {
        id: "all_night_party",
        title: "All-Night Party",
        description: "Peak-time dance floor heat for celebrations and festivals.",
        tags: &["party", "dance", "festival", "celebration", "club", "friends"],
        targets: &[
            ("target_energy", 0.88),
            ("target_valence", 0.85),
            ("target_tempo", 126.0),
            ("target_danceability", 0.85),
        ],
        seed_genres: &["dance", "house", "edm"],
    },
    VibeTemplate {
        id: "rainy_day_indie",
        title: "Rainy Day Windows",
        description: "Soft melancholy for rain against the glass.",
        tags: &["rainy", "rain", "storm", "cozy", "melancholy", "grey"],
        targets: &[
            ("target_energy", 0.35),
            ("target_valence", 0.38),
            ("target_tempo", 90.0),
            ("target_acousticness", 0.6),
        ],
        seed_genres: &["rainy-day", "indie", "acoustic"],
    },
    VibeTemplate {
        id: "island_escape",
        title: "Island Escape",
        description: "Tropical breeze, beaches and turquoise water.",
        tags: &["beach", "tropical", "island", "ocean", "summer", "caribbean"],
        targets: &[
            ("target_energy", 0.62),
            ("target_valence", 0.8),
            ("target_tempo", 108.0),
            ("target_danceability", 0.72),
        ],
        seed_genres: &["reggae", "dancehall", "tropical"],
    },
    VibeTemplate {
        id: "midnight_drive",
        title: "Midnight Drive",
        description: "Neon-lit synths for empty highways after dark.",
        tags: &["night", "drive", "roadtrip", "night-drive", "city", "midnight"],
        targets: &[
            ("target_energy", 0.55),
            ("target_valence", 0.45),
            ("target_tempo", 105.0),
            ("target_danceability", 0.6),
        ],
        seed_genres: &["synthwave", "electro", "indie-pop"],
    },
    VibeTemplate {
        id: "wind_down_sleep",
        title: "Wind Down",
        description: "Barely-there ambient drift for sleep and meditation.",
        tags: &["sleep", "meditation", "calm", "yoga", "ambient", "soothing"],
        targets: &[
            ("target_energy", 0.15),
            ("target_valence", 0.45),
            ("target_tempo", 65.0),
            ("target_instrumentalness", 0.9),
        ],
        seed_genres: &["sleep", "ambient", "new-age"],
    },
    VibeTemplate {
        id: "latin_fiesta",
        title: "Latin Fiesta",
        description: "Reggaeton and Latin pop built for moving.",
        tags: &["latin", "fiesta", "reggaeton", "salsa", "spanish", "dance"],
        targets: &[
            ("target_energy", 0.8),
            ("target_valence", 0.82),
            ("target_tempo", 100.0),
            ("target_danceability", 0.85),
        ],
        seed_genres: &["latin", "reggaeton", "salsa"],
    },
    VibeTemplate {
        id: "carnival_do_brasil",
        title: "Carnival do Brasil",
        description: "Samba, MPB and Rio street-party percussion.",
        tags: &["brazil", "rio", "samba", "carnival", "mpb", "bossa"],
        targets: &[
            ("target_energy", 0.75),
            ("target_valence", 0.85),
            ("target_tempo", 104.0),
            ("target_danceability", 0.8),
        ],
        seed_genres: &["samba", "mpb", "brazilian"],
    },
    VibeTemplate {
        id: "campfire_acoustic",
        title: "Campfire Embers",
        description: "Acoustic guitars and folk harmonies under the stars.",
        tags: &["campfire", "outdoor", "acoustic", "folk", "camping", "nature"],
        targets: &[
            ("target_energy", 0.4),
            ("target_valence", 0.6),
            ("target_tempo", 92.0),
            ("target_acousticness", 0.8),
        ],
        seed_genres: &["acoustic", "folk", "singer-songwriter"],
    },
    VibeTemplate {
        id: "coffeehouse_cozy",
        title: "Coffeehouse Corner",
        description: "Cozy jazz and soul for slow mornings with coffee.",
        tags: &["coffee", "cozy", "morning", "cafe", "jazz", "brunch"],
        targets: &[
            ("target_energy", 0.42),
            ("target_valence", 0.62),
            ("target_tempo", 95.0),
            ("target_acousticness", 0.6),
        ],
        seed_genres: &["jazz", "soul", "chill"],
    },
    VibeTemplate {
        id: "storm_and_thunder",
        title: "Storm and Thunder",
        description: "Dramatic, cinematic intensity for dark skies.",
        tags: &["storm", "dark", "dramatic", "cinematic", "thunder", "moody"],
        targets: &[
            ("target_energy", 0.66),
            ("target_valence", 0.3),
            ("target_tempo", 110.0),
            ("target_instrumentalness", 0.6),
        ],
        seed_genres: &["movies", "classical", "alternative"],
    },
    VibeTemplate {
        id: "night_market_wander",
        title: "Night Market",
        description: "Street food, neon stalls and late-city buzz.",
        tags: &["market", "street-food", "night", "city", "travel", "wander"],
        targets: &[
            ("target_energy", 0.6),
            ("target_valence", 0.68),
            ("target_tempo", 102.0),
            ("target_danceability", 0.65),
        ],
        seed_genres: &["world-music", "electro", "hip-hop"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_template_ids_are_unique() {
        let ids: HashSet<&str> = VIBE_TEMPLATES.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), VIBE_TEMPLATES.len());
    }

    #[test]
    fn test_templates_have_tags_and_seeds() {
        for template in VIBE_TEMPLATES {
            assert!(!template.tags.is_empty(), "{} has no tags", template.id);
            assert!(
                !template.seed_genres.is_empty(),
                "{} has no seeds",
                template.id
            );
            assert!(template.seed_genres.len() <= 5);
        }
    }

    #[test]
    fn test_template_data_is_normalized() {
        for template in VIBE_TEMPLATES {
            for tag in template.tags {
                assert_eq!(*tag, tag.to_lowercase(), "{}", template.id);
            }
            let unique: HashSet<&str> = template.seed_genres.iter().copied().collect();
            assert_eq!(unique.len(), template.seed_genres.len(), "{}", template.id);
        }
    }
}
