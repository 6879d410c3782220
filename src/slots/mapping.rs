//! Translate structured vibe slots into recommendation parameters.
//!
//! Additive per-field deltas are layered over a fixed baseline (mood always,
//! activity and time of day when present), then an intensity adjustment, and
//! only then is everything clamped. The deltas-then-clamp order is
//! load-bearing: clamping between layers would double-count at the
//! boundaries.

use super::{Activity, Mood, StructuredSlots, TimeOfDay};
use crate::vibe::ParameterSet;
use tracing::info;

const FALLBACK_GENRES: &[&str] = &["pop", "indie", "electronic"];

const LANGUAGE_TO_GENRES: &[(&str, &[&str])] = &[
    ("fr", &["french-pop", "chanson", "jazz"]),
    ("es", &["latin", "spanish-pop", "reggaeton"]),
    ("en", &["indie-pop", "alt-rock", "uk-pop"]),
    ("pt", &["brazilian", "samba", "mpb"]),
    ("br", &["brazilian", "samba", "bossa-nova"]),
    ("it", &["italian-pop", "cantautori", "classic-italian-pop"]),
    ("de", &["german-pop", "electro", "techno"]),
    ("jp", &["j-pop", "city-pop", "anime"]),
    ("kr", &["k-pop", "k-hip-hop", "k-indie"]),
];

const PLACE_TO_LOCALE: &[(&str, &str)] = &[
    ("paris", "fr"),
    ("lyon", "fr"),
    ("marseille", "fr"),
    ("madrid", "es"),
    ("barcelona", "es"),
    ("mexico", "es"),
    ("buenos aires", "es"),
    ("rio", "pt"),
    ("rio de janeiro", "pt"),
    ("sao paulo", "pt"),
    ("lisbon", "pt"),
    ("rome", "it"),
    ("milan", "it"),
    ("berlin", "de"),
    ("munich", "de"),
    ("tokyo", "jp"),
    ("kyoto", "jp"),
    ("seoul", "kr"),
    ("busan", "kr"),
    ("new york", "en"),
    ("london", "en"),
    ("los angeles", "en"),
    ("chicago", "en"),
];

/// Accumulator for the seven unit-scale features plus tempo.
#[derive(Debug, Clone, Copy)]
struct FeatureMix {
    valence: f64,
    energy: f64,
    danceability: f64,
    acousticness: f64,
    instrumentalness: f64,
    liveness: f64,
    speechiness: f64,
    tempo: f64,
}

impl FeatureMix {
    fn baseline() -> Self {
        Self {
            valence: 0.5,
            energy: 0.5,
            danceability: 0.5,
            acousticness: 0.5,
            instrumentalness: 0.2,
            liveness: 0.12,
            speechiness: 0.05,
            tempo: 100.0,
        }
    }

    fn apply_mood(&mut self, mood: Mood) {
        match mood {
            Mood::Romantic => {
                self.valence += 0.20;
                self.energy -= 0.10;
                self.acousticness += 0.10;
                self.danceability += 0.05;
            }
            Mood::Melancholic => {
                self.valence -= 0.20;
                self.energy -= 0.10;
                self.acousticness += 0.10;
            }
            Mood::Happy => {
                self.valence += 0.25;
                self.energy += 0.15;
                self.danceability += 0.10;
                self.tempo += 10.0;
            }
            Mood::Energetic => {
                self.energy += 0.30;
                self.danceability += 0.10;
                self.valence += 0.10;
                self.tempo += 20.0;
            }
            Mood::Calm => {
                self.energy -= 0.20;
                self.valence += 0.05;
                self.instrumentalness += 0.10;
                self.tempo -= 20.0;
            }
            Mood::Dark => {
                self.valence -= 0.25;
                self.energy += 0.05;
                self.acousticness -= 0.10;
                self.speechiness -= 0.02;
            }
            Mood::Nostalgic => {
                self.valence += 0.05;
                self.danceability -= 0.05;
                self.acousticness += 0.05;
            }
            Mood::Confident => {
                self.energy += 0.20;
                self.valence += 0.15;
                self.danceability += 0.10;
                self.tempo += 12.0;
            }
            Mood::Angry => {
                self.energy += 0.35;
                self.valence -= 0.25;
                self.danceability += 0.05;
                self.tempo += 25.0;
            }
            Mood::Hopeful => {
                self.valence += 0.18;
                self.energy += 0.08;
                self.danceability += 0.05;
            }
            Mood::Bittersweet => {
                self.valence -= 0.05;
                self.energy -= 0.05;
                self.acousticness += 0.08;
            }
        }
    }

    fn apply_activity(&mut self, activity: Activity) {
        match activity {
            Activity::Coding => {
                self.instrumentalness += 0.50;
                self.speechiness -= 0.02;
                self.energy -= 0.10;
                self.tempo -= 20.0;
            }
            Activity::Studying => {
                self.instrumentalness += 0.45;
                self.energy -= 0.10;
                self.tempo -= 15.0;
            }
            Activity::Party => {
                self.energy += 0.30;
                self.danceability += 0.20;
                self.tempo += 20.0;
                self.instrumentalness -= 0.10;
            }
            Activity::Dinner => {
                self.energy -= 0.10;
                self.acousticness += 0.10;
                self.danceability += 0.05;
                self.tempo -= 10.0;
            }
            Activity::Workout => {
                self.energy += 0.35;
                self.danceability += 0.10;
                self.tempo += 25.0;
            }
            Activity::Drive => {
                self.energy += 0.05;
                self.danceability += 0.05;
                self.tempo += 8.0;
            }
            Activity::Sleep => {
                self.energy -= 0.35;
                self.tempo -= 30.0;
                self.liveness -= 0.05;
                self.instrumentalness += 0.25;
            }
            Activity::Focus => {
                self.instrumentalness += 0.35;
                self.energy -= 0.15;
                self.tempo -= 18.0;
                self.speechiness -= 0.03;
            }
            Activity::Relax => {
                self.energy -= 0.15;
                self.acousticness += 0.15;
                self.tempo -= 15.0;
            }
            Activity::Run => {
                self.energy += 0.30;
                self.tempo += 18.0;
                self.danceability += 0.08;
            }
            Activity::Dance => {
                self.danceability += 0.30;
                self.energy += 0.20;
                self.tempo += 22.0;
            }
        }
    }

    fn apply_time(&mut self, time: TimeOfDay) {
        match time {
            TimeOfDay::Morning => {
                self.energy += 0.10;
                self.valence += 0.10;
                self.tempo += 10.0;
            }
            TimeOfDay::Afternoon => {
                self.energy += 0.05;
                self.valence += 0.05;
            }
            TimeOfDay::Sunset => {
                self.valence += 0.05;
                self.energy -= 0.05;
            }
            TimeOfDay::Evening => {
                self.energy -= 0.05;
                self.danceability += 0.05;
            }
            TimeOfDay::LateNight => {
                self.tempo -= 20.0;
                self.liveness -= 0.04;
                self.energy -= 0.10;
            }
            TimeOfDay::None => {}
        }
    }

    fn clamp(&mut self) {
        self.valence = clamp_unit(self.valence).min(0.97);
        self.energy = clamp_unit(self.energy).min(0.92);
        self.danceability = clamp_unit(self.danceability).min(0.97);
        self.acousticness = clamp_unit(self.acousticness).min(0.97);
        self.instrumentalness = clamp_unit(self.instrumentalness).min(0.97);
        self.liveness = clamp_unit(self.liveness).min(0.97);
        // Speechiness gets no extra cap.
        self.speechiness = clamp_unit(self.speechiness);
        self.tempo = clamp_tempo(self.tempo);
    }
}

fn clamp_unit(value: f64) -> f64 {
    let rounded = (value * 1000.0).round() / 1000.0;
    rounded.clamp(0.0, 1.0)
}

fn clamp_tempo(value: f64) -> f64 {
    let rounded = (value * 10.0).round() / 10.0;
    rounded.clamp(50.0, 160.0)
}

fn mood_genres(mood: Mood) -> &'static [&'static str] {
    match mood {
        Mood::Romantic => &["indie-pop", "jazz", "soul"],
        Mood::Melancholic => &["acoustic", "singer-songwriter", "indie"],
        Mood::Happy => &["pop", "dance", "funk"],
        Mood::Energetic => &["edm", "electro-pop", "alt-rock"],
        Mood::Calm => &["ambient", "chill", "neo-classical"],
        Mood::Dark => &["darkwave", "industrial", "alternative"],
        Mood::Nostalgic => &["soft-rock", "classic-rock", "motown"],
        Mood::Confident => &["hip-hop", "r-n-b", "trap"],
        Mood::Angry => &["metal", "hard-rock", "punk"],
        Mood::Hopeful => &["indie-folk", "dream-pop", "gospel"],
        Mood::Bittersweet => &["indie", "chamber-pop", "acoustic"],
    }
}

fn activity_genres(activity: Activity) -> &'static [&'static str] {
    match activity {
        Activity::Coding => &["lo-fi", "ambient", "downtempo", "minimal-techno"],
        Activity::Studying => &["piano", "neo-classical", "ambient"],
        Activity::Party => &["dance", "house", "edm", "hip-hop"],
        Activity::Dinner => &["jazz", "bossa-nova", "lounge"],
        Activity::Workout => &["edm", "dance", "hip-hop"],
        Activity::Drive => &["synthwave", "indie-pop", "alt-rock"],
        Activity::Sleep => &["ambient", "piano", "lo-fi"],
        Activity::Focus => &["ambient", "minimal", "neo-classical"],
        Activity::Relax => &["chill", "acoustic", "soul"],
        Activity::Run => &["edm", "dance", "hip-hop"],
        Activity::Dance => &["dance", "disco", "funk"],
    }
}

/// An explicit language code wins even when it has no genre mapping: it is
/// the stronger signal, and falling through to place matching would inject
/// genres the user's language contradicts.
fn detect_locale(slots: &StructuredSlots) -> Option<String> {
    if let Some(locale) = &slots.language_or_locale {
        let candidate = locale.trim().to_lowercase();
        if let Some(prefix) = candidate.get(..2) {
            return Some(prefix.to_string());
        }
    }
    if let Some(place) = &slots.place {
        let place = place.trim().to_lowercase();
        if !place.is_empty() {
            for (name, code) in PLACE_TO_LOCALE {
                if place.contains(name) {
                    return Some(code.to_string());
                }
            }
        }
    }
    None
}

fn locale_genres(code: &str) -> Option<&'static [&'static str]> {
    LANGUAGE_TO_GENRES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, genres)| *genres)
}

fn normalize_hint(text: &str) -> String {
    text.trim().to_lowercase().replace(' ', "-")
}

fn extend_unique(target: &mut Vec<String>, values: impl IntoIterator<Item = String>) {
    for value in values {
        let norm = value.trim().to_lowercase();
        if norm.is_empty() || target.contains(&norm) {
            continue;
        }
        target.push(norm);
    }
}

/// Map validated slots to recommendation targets and seed genres.
pub fn slots_to_params(slots: &StructuredSlots) -> ParameterSet {
    let mut mix = FeatureMix::baseline();

    mix.apply_mood(slots.mood);
    if let Some(activity) = slots.activity {
        mix.apply_activity(activity);
    }
    mix.apply_time(slots.time_of_day);

    // Intensity 3 is neutral; 1 and 5 are the extremes.
    let steps = slots.intensity as f64 - 3.0;
    mix.energy += steps * 0.08;
    mix.tempo += steps * 6.0;

    mix.clamp();

    let mut params = ParameterSet::default();
    params.set_target("target_valence", mix.valence);
    params.set_target("target_energy", mix.energy);
    params.set_target("target_danceability", mix.danceability);
    params.set_target("target_acousticness", mix.acousticness);
    params.set_target("target_instrumentalness", mix.instrumentalness);
    params.set_target("target_liveness", mix.liveness);
    params.set_target("target_speechiness", mix.speechiness);
    params.set_target("target_tempo", mix.tempo);

    let mut seeds: Vec<String> = Vec::new();
    extend_unique(&mut seeds, slots.style_hints.iter().map(|h| normalize_hint(h)));

    let locale = detect_locale(slots);
    if let Some(genres) = locale.as_deref().and_then(locale_genres) {
        extend_unique(&mut seeds, genres.iter().map(|g| g.to_string()));
    }

    extend_unique(&mut seeds, mood_genres(slots.mood).iter().map(|g| g.to_string()));
    if let Some(activity) = slots.activity {
        extend_unique(&mut seeds, activity_genres(activity).iter().map(|g| g.to_string()));
    }

    if seeds.len() < 3 {
        extend_unique(&mut seeds, FALLBACK_GENRES.iter().map(|g| g.to_string()));
    }
    if seeds.len() == 1 {
        extend_unique(&mut seeds, FALLBACK_GENRES.iter().map(|g| g.to_string()));
    }
    seeds.truncate(5);
    params.seed_genres = seeds;

    info!(
        mood = ?slots.mood,
        activity = ?slots.activity,
        seeds = ?params.seed_genres,
        "Mapped slots to recommendation params"
    );
    params
}
