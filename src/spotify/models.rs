//! Data models shared between the Spotify client and the rest of the crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A track as returned by the upstream catalog.
///
/// This is the caller-visible shape; wire types used to parse the Spotify
/// responses live in the client module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
    pub image_url: Option<String>,
    pub duration_ms: Option<u64>,
}

/// A single recommendations request: seed genre subset, numeric targets and
/// an optional popularity window.
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    /// Seed genres, at most 5 (enforced by the caller).
    pub seed_genres: Vec<String>,
    /// `target_*` feature keys mapped to their values.
    pub targets: BTreeMap<String, f64>,
    pub min_popularity: Option<u8>,
    pub max_popularity: Option<u8>,
    pub limit: u32,
}
