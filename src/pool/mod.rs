//! Track pool assembly and refinement.

pub mod assembler;
pub mod refiner;

pub use assembler::TrackPoolAssembler;
pub use refiner::ResultRefiner;

use crate::spotify::Track;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref FEAT_RE: Regex =
        Regex::new(r"(?i)\s*[(\[][^)\]]*\b(?:feat\.?|ft\.?|featuring|with)\b[^)\]]*[)\]]").unwrap();
    static ref PAREN_VERSION_RE: Regex = Regex::new(
        r"(?i)\s*[(\[][^)\]]*\b(?:remaster(?:ed)?|version|edit|mix|live|mono|stereo|demo|deluxe|acoustic)\b[^)\]]*[)\]]"
    )
    .unwrap();
    static ref DASH_VERSION_RE: Regex = Regex::new(
        r"(?i)\s*[-–—]\s*(?:\d{4}\s+)?(?:remaster(?:ed)?|live|mono|stereo|radio edit|single version|extended|acoustic|demo)\b.*$"
    )
    .unwrap();
}

/// Normalized `artist—title` identity for a track, tolerant of re-releases.
///
/// Featuring credits and version/remaster descriptors are stripped from the
/// title so a remaster does not slip past an exclusion on the original.
pub fn track_key(track: &Track) -> String {
    let artist = track
        .artists
        .first()
        .map(|a| a.trim().to_lowercase())
        .unwrap_or_default();
    let title = track.name.to_lowercase();
    let title = FEAT_RE.replace_all(&title, "");
    let title = PAREN_VERSION_RE.replace_all(&title, "");
    let title = DASH_VERSION_RE.replace(&title, "");
    format!("{artist}—{}", title.trim())
}

/// Caller-supplied tracks to omit, by id and by normalized key.
#[derive(Debug, Default, Clone)]
pub struct ExclusionFilter {
    ids: HashSet<String>,
    keys: HashSet<String>,
}

impl ExclusionFilter {
    pub fn new(ids: HashSet<String>, keys: HashSet<String>) -> Self {
        Self { ids, keys }
    }

    /// Build the key set from previously seen tracks.
    pub fn from_tracks<'a>(
        ids: HashSet<String>,
        seen: impl IntoIterator<Item = &'a Track>,
    ) -> Self {
        let keys = seen.into_iter().map(track_key).collect();
        Self { ids, keys }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.keys.is_empty()
    }

    pub fn allows(&self, track: &Track) -> bool {
        if self.ids.contains(&track.id) {
            return false;
        }
        self.keys.is_empty() || !self.keys.contains(&track_key(track))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, name: &str, artist: &str) -> Track {
        Track {
            id: id.to_string(),
            name: name.to_string(),
            artists: vec![artist.to_string()],
            preview_url: None,
            external_url: None,
            image_url: None,
            duration_ms: None,
        }
    }

    #[test]
    fn test_track_key_strips_feat_credit() {
        let a = track("1", "Runaway (feat. Pusha T)", "Kanye West");
        let b = track("2", "Runaway", "Kanye West");
        assert_eq!(track_key(&a), track_key(&b));
        assert_eq!(track_key(&b), "kanye west—runaway");
    }

    #[test]
    fn test_track_key_strips_version_descriptors() {
        let a = track("1", "Heroes - 2017 Remastered", "David Bowie");
        let b = track("2", "Heroes (Single Version) [Remastered]", "David Bowie");
        let c = track("3", "Heroes", "David Bowie");
        let d = track("4", "Heroes - Remastered 2017", "David Bowie");
        assert_eq!(track_key(&a), track_key(&c));
        assert_eq!(track_key(&b), track_key(&c));
        assert_eq!(track_key(&d), track_key(&c));
    }

    #[test]
    fn test_year_tagged_remaster_is_excluded_by_key() {
        let original = track("1", "Heroes", "David Bowie");
        let filter = ExclusionFilter::from_tracks(HashSet::new(), [&original]);
        let reissue = track("2", "Heroes - 2017 Remastered", "David Bowie");
        assert!(!filter.allows(&reissue));
    }

    #[test]
    fn test_track_key_keeps_distinct_songs_distinct() {
        let a = track("1", "One More Time", "Daft Punk");
        let b = track("2", "One More Chance", "Daft Punk");
        assert_ne!(track_key(&a), track_key(&b));
    }

    #[test]
    fn test_exclusion_by_id_and_key() {
        let heard = track("abc", "Midnight City", "M83");
        let filter = ExclusionFilter::from_tracks(
            HashSet::from(["abc".to_string()]),
            [&heard],
        );

        assert!(!filter.allows(&heard));
        // Same song under a different id is still excluded by key.
        let reissue = track("xyz", "Midnight City - Remastered", "M83");
        assert!(!filter.allows(&reissue));
        // A different song passes.
        assert!(filter.allows(&track("def", "Wait", "M83")));
    }

    #[test]
    fn test_empty_filter_allows_everything() {
        let filter = ExclusionFilter::default();
        assert!(filter.is_empty());
        assert!(filter.allows(&track("1", "Anything", "Anyone")));
    }
}
