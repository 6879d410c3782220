//! Structured vibe slots extracted from free text by the LLM.
//!
//! Enumerated fields belong to closed sets; unrecognized values coming from
//! the model are coerced through small alias tables at the boundary, or
//! dropped. A payload whose required fields cannot be coerced is rejected
//! as a whole and the caller falls back to phrase parsing.

pub mod mapping;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Phrases the legacy rule mapper already handles well; the LLM extractor
/// is skipped entirely for these.
const LEGACY_PHRASES: &[&str] = &[
    "focus",
    "study",
    "studying",
    "chill",
    "lofi",
    "lo-fi",
    "happy",
    "sad",
    "angry",
    "romantic",
    "workout",
    "party",
    "energetic",
    "calm",
    "sleep",
    "relax",
    "drive",
];

pub fn is_legacy_phrase(raw: &str) -> bool {
    let phrase = raw.trim().to_lowercase();
    if phrase.is_empty() {
        return true;
    }
    LEGACY_PHRASES.contains(&phrase.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Romantic,
    Melancholic,
    Happy,
    Energetic,
    Calm,
    Dark,
    Nostalgic,
    Confident,
    Angry,
    Hopeful,
    Bittersweet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Coding,
    Studying,
    Party,
    Dinner,
    Workout,
    Drive,
    Sleep,
    Focus,
    Relax,
    Run,
    Dance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Sunset,
    Evening,
    LateNight,
    /// Sentinel for "not specified"; applies no deltas.
    None,
}

impl Mood {
    fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        let coerced = match key.as_str() {
            "romantic" => Mood::Romantic,
            "melancholic" => Mood::Melancholic,
            "happy" => Mood::Happy,
            "energetic" => Mood::Energetic,
            "calm" => Mood::Calm,
            "dark" => Mood::Dark,
            "nostalgic" => Mood::Nostalgic,
            "confident" => Mood::Confident,
            "angry" => Mood::Angry,
            "hopeful" => Mood::Hopeful,
            "bittersweet" => Mood::Bittersweet,
            // Aliases for values the model likes to invent.
            "focused" | "focus" => Mood::Calm,
            "productive" => Mood::Confident,
            _ => return Option::None,
        };
        Some(coerced)
    }
}

impl Activity {
    fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        let coerced = match key.as_str() {
            "coding" => Activity::Coding,
            "studying" => Activity::Studying,
            "party" => Activity::Party,
            "dinner" => Activity::Dinner,
            "workout" => Activity::Workout,
            "drive" => Activity::Drive,
            "sleep" => Activity::Sleep,
            "focus" => Activity::Focus,
            "relax" => Activity::Relax,
            "run" => Activity::Run,
            "dance" => Activity::Dance,
            "coding session" | "programming" => Activity::Coding,
            "study" => Activity::Studying,
            "jiujitsu" | "jiu-jitsu" | "martial arts" => Activity::Workout,
            _ => return Option::None,
        };
        Some(coerced)
    }
}

impl TimeOfDay {
    fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        let coerced = match key.as_str() {
            "morning" => TimeOfDay::Morning,
            "afternoon" => TimeOfDay::Afternoon,
            "sunset" => TimeOfDay::Sunset,
            "evening" => TimeOfDay::Evening,
            "late_night" => TimeOfDay::LateNight,
            "none" => TimeOfDay::None,
            "night" | "midnight" | "evening late" => TimeOfDay::LateNight,
            _ => return Option::None,
        };
        Some(coerced)
    }
}

/// Validated structured slots.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredSlots {
    pub mood: Mood,
    pub activity: Option<Activity>,
    pub time_of_day: TimeOfDay,
    pub place: Option<String>,
    pub era: Option<String>,
    /// 1 = very mellow, 5 = very intense; 3 is neutral.
    pub intensity: u8,
    pub style_hints: Vec<String>,
    pub language_or_locale: Option<String>,
    pub confidence: f64,
}

/// The untrusted payload shape produced by the LLM.
#[derive(Debug, Default, Deserialize)]
pub struct RawSlots {
    pub mood: Option<String>,
    pub activity: Option<String>,
    pub time_of_day: Option<String>,
    pub place: Option<String>,
    pub era: Option<String>,
    pub intensity: Option<i64>,
    #[serde(default)]
    pub style_hints: Vec<String>,
    pub language_or_locale: Option<String>,
    pub confidence: Option<f64>,
}

impl StructuredSlots {
    /// Validate an untrusted payload into structured slots.
    ///
    /// Returns `None` when a required field is missing or out of bounds;
    /// unrecognized optional enum values are dropped to their defaults.
    pub fn from_raw(raw: RawSlots) -> Option<Self> {
        let mood = Mood::parse(raw.mood.as_deref()?)?;

        let activity = raw.activity.as_deref().and_then(Activity::parse);
        if raw.activity.is_some() && activity.is_none() {
            debug!(raw = ?raw.activity, "Dropping unrecognized activity");
        }

        let time_of_day = raw
            .time_of_day
            .as_deref()
            .and_then(TimeOfDay::parse)
            .unwrap_or(TimeOfDay::None);

        let intensity = raw.intensity.unwrap_or(3);
        if !(1..=5).contains(&intensity) {
            return Option::None;
        }

        let confidence = raw.confidence?;
        if !(0.0..=1.0).contains(&confidence) {
            return Option::None;
        }

        let style_hints = raw
            .style_hints
            .into_iter()
            .filter(|h| !h.trim().is_empty())
            .collect();

        Some(StructuredSlots {
            mood,
            activity,
            time_of_day,
            place: raw.place.filter(|p| !p.trim().is_empty()),
            era: raw.era.filter(|e| !e.trim().is_empty()),
            intensity: intensity as u8,
            style_hints,
            language_or_locale: raw.language_or_locale.filter(|l| !l.trim().is_empty()),
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(mood: &str) -> RawSlots {
        RawSlots {
            mood: Some(mood.to_string()),
            confidence: Some(0.8),
            ..Default::default()
        }
    }

    #[test]
    fn test_legacy_phrase_detection() {
        assert!(is_legacy_phrase("chill"));
        assert!(is_legacy_phrase("  Workout "));
        assert!(is_legacy_phrase(""));
        assert!(!is_legacy_phrase("safari adventure in madagascar"));
    }

    #[test]
    fn test_mood_aliases_coerce() {
        assert_eq!(Mood::parse("focused"), Some(Mood::Calm));
        assert_eq!(Mood::parse("productive"), Some(Mood::Confident));
        assert_eq!(Mood::parse("euphoric"), None);
    }

    #[test]
    fn test_activity_aliases_coerce() {
        assert_eq!(Activity::parse("programming"), Some(Activity::Coding));
        assert_eq!(Activity::parse("jiu-jitsu"), Some(Activity::Workout));
        assert_eq!(Activity::parse("study"), Some(Activity::Studying));
    }

    #[test]
    fn test_time_aliases_coerce() {
        assert_eq!(TimeOfDay::parse("midnight"), Some(TimeOfDay::LateNight));
        assert_eq!(TimeOfDay::parse("none"), Some(TimeOfDay::None));
    }

    #[test]
    fn test_from_raw_requires_valid_mood() {
        assert!(StructuredSlots::from_raw(raw("happy")).is_some());
        assert!(StructuredSlots::from_raw(raw("vibing")).is_none());
        assert!(StructuredSlots::from_raw(RawSlots::default()).is_none());
    }

    #[test]
    fn test_from_raw_drops_unknown_activity() {
        let mut payload = raw("happy");
        payload.activity = Some("skydiving".to_string());
        let slots = StructuredSlots::from_raw(payload).unwrap();
        assert!(slots.activity.is_none());
    }

    #[test]
    fn test_from_raw_rejects_out_of_bounds() {
        let mut payload = raw("happy");
        payload.intensity = Some(9);
        assert!(StructuredSlots::from_raw(payload).is_none());

        let mut payload = raw("happy");
        payload.confidence = Some(1.5);
        assert!(StructuredSlots::from_raw(payload).is_none());
    }

    #[test]
    fn test_from_raw_defaults_and_hint_cleanup() {
        let mut payload = raw("calm");
        payload.style_hints = vec!["lo-fi".to_string(), "  ".to_string()];
        let slots = StructuredSlots::from_raw(payload).unwrap();
        assert_eq!(slots.intensity, 3);
        assert_eq!(slots.time_of_day, TimeOfDay::None);
        assert_eq!(slots.style_hints, vec!["lo-fi"]);
    }
}
