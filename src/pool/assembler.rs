//! Batched, diversified track fetching against the upstream catalog.
//!
//! Each batch re-rolls its seed subset, target jitter and popularity window
//! so repeated requests for the same vibe do not return the same pool.

use super::{ExclusionFilter, track_key};
use crate::spotify::{CatalogService, RecommendationRequest, SpotifyError, Track};
use crate::vibe::ParameterSet;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) const RECOMMENDATION_BATCHES: usize = 4;
pub(crate) const BATCH_LIMIT: u32 = 30;
pub(crate) const SEARCH_LIMIT_PER_SEED: u32 = 15;

const DECADES: &[u32] = &[1980, 1990, 2000, 2010, 2020];

/// Randomness is rolled up-front in plain functions so no RNG handle lives
/// across an await point.
fn jittered_request(params: &ParameterSet) -> RecommendationRequest {
    let mut rng = rand::rng();

    let mut seeds: Vec<String> = if params.seed_genres.is_empty() {
        vec!["pop".to_string()]
    } else {
        params.seed_genres.clone()
    };
    seeds.shuffle(&mut rng);
    let take = rng.random_range(1..=seeds.len().min(5));
    seeds.truncate(take);

    let mut targets = BTreeMap::new();
    for (key, value) in &params.targets {
        let jittered = if key == "target_tempo" {
            (value + rng.random_range(-6.0..=6.0)).clamp(40.0, 200.0)
        } else {
            (value * (1.0 + rng.random_range(-0.08..=0.08))).clamp(0.0, 1.0)
        };
        targets.insert(key.clone(), jittered);
    }

    let min_popularity = rng.random_range(5..=70u8);
    let max_popularity = (min_popularity + 10).max(rng.random_range(60..=100u8));

    RecommendationRequest {
        seed_genres: seeds,
        targets,
        min_popularity: Some(min_popularity),
        max_popularity: Some(max_popularity),
        limit: BATCH_LIMIT,
    }
}

fn fallback_query(seed: &str) -> (String, u32) {
    let mut rng = rand::rng();
    let decade = *DECADES.choose(&mut rng).unwrap_or(&2010);
    let offset = rng.random_range(0..50);
    (format!("{seed} year:{decade}-{}", decade + 9), offset)
}

/// Assembles a deduplicated track pool from the upstream catalog.
pub struct TrackPoolAssembler {
    service: Arc<dyn CatalogService>,
}

impl TrackPoolAssembler {
    pub fn new(service: Arc<dyn CatalogService>) -> Self {
        Self { service }
    }

    /// Fetch a pool for the resolved parameters.
    ///
    /// Batch failures are soft: a failing batch is logged and skipped. Only
    /// when every batch and the search fallback produce nothing does this
    /// return an error, carrying the last recorded failure detail.
    pub async fn assemble(&self, params: &ParameterSet) -> Result<Vec<Track>, SpotifyError> {
        let mut pool: Vec<Track> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut last_failure: Option<SpotifyError> = None;

        for batch in 0..RECOMMENDATION_BATCHES {
            let request = jittered_request(params);
            match self.service.recommendations(&request).await {
                Ok(tracks) => {
                    let before = pool.len();
                    for track in tracks {
                        if seen.insert(track.id.clone()) {
                            pool.push(track);
                        }
                    }
                    debug!(batch, added = pool.len() - before, "Recommendation batch done");
                }
                Err(SpotifyError::NotConfigured) => return Err(SpotifyError::NotConfigured),
                Err(e) => {
                    warn!(batch, error = %e, "Recommendation batch failed");
                    last_failure = Some(e);
                }
            }
        }

        if pool.is_empty() {
            warn!("All recommendation batches empty; trying search fallback");
            pool = self
                .search_fallback(params, &ExclusionFilter::default())
                .await;
        }

        if pool.is_empty() {
            let detail = last_failure
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no tracks from any source".to_string());
            return Err(SpotifyError::Exhausted(detail));
        }
        Ok(pool)
    }

    /// Keyword-search aggregation across the seed genres.
    ///
    /// One search per seed with a randomized decade filter and offset.
    /// Failures are soft; duplicates and excluded tracks are dropped.
    pub async fn search_fallback(
        &self,
        params: &ParameterSet,
        exclusions: &ExclusionFilter,
    ) -> Vec<Track> {
        let seeds: Vec<String> = if params.seed_genres.is_empty() {
            vec!["pop".to_string()]
        } else {
            params.seed_genres.clone()
        };

        let mut pool: Vec<Track> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut seen_keys: HashSet<String> = HashSet::new();

        for seed in &seeds {
            let (query, offset) = fallback_query(seed);
            match self
                .service
                .search_tracks(&query, SEARCH_LIMIT_PER_SEED, offset)
                .await
            {
                Ok(tracks) => {
                    for track in tracks {
                        if !exclusions.allows(&track) {
                            continue;
                        }
                        let key = track_key(&track);
                        if seen.insert(track.id.clone()) && seen_keys.insert(key) {
                            pool.push(track);
                        }
                    }
                }
                Err(e) => warn!(seed = %seed, error = %e, "Search fallback failed for seed"),
            }
        }
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            name: format!("Track {id}"),
            artists: vec!["Artist".to_string()],
            preview_url: None,
            external_url: None,
            image_url: None,
            duration_ms: Some(200_000),
        }
    }

    fn params() -> ParameterSet {
        let mut p = ParameterSet::default();
        p.set_target("target_energy", 0.7);
        p.set_target("target_tempo", 120.0);
        p.seed_genres = vec!["pop".to_string(), "dance".to_string(), "edm".to_string()];
        p
    }

    /// Scripted catalog: pops one canned response per call.
    struct ScriptedCatalog {
        recommendations: Mutex<Vec<Result<Vec<Track>, SpotifyError>>>,
        searches: Mutex<Vec<Result<Vec<Track>, SpotifyError>>>,
        requests_seen: Mutex<Vec<RecommendationRequest>>,
    }

    impl ScriptedCatalog {
        fn new(
            recommendations: Vec<Result<Vec<Track>, SpotifyError>>,
            searches: Vec<Result<Vec<Track>, SpotifyError>>,
        ) -> Self {
            Self {
                recommendations: Mutex::new(recommendations),
                searches: Mutex::new(searches),
                requests_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogService for ScriptedCatalog {
        async fn recommendations(
            &self,
            request: &RecommendationRequest,
        ) -> Result<Vec<Track>, SpotifyError> {
            self.requests_seen.lock().unwrap().push(request.clone());
            let mut scripted = self.recommendations.lock().unwrap();
            if scripted.is_empty() {
                Ok(Vec::new())
            } else {
                scripted.remove(0)
            }
        }

        async fn search_tracks(
            &self,
            _query: &str,
            _limit: u32,
            _offset: u32,
        ) -> Result<Vec<Track>, SpotifyError> {
            let mut scripted = self.searches.lock().unwrap();
            if scripted.is_empty() {
                Ok(Vec::new())
            } else {
                scripted.remove(0)
            }
        }

        async fn available_genre_seeds(&self) -> Result<HashSet<String>, SpotifyError> {
            Ok(HashSet::new())
        }
    }

    #[tokio::test]
    async fn test_assemble_dedupes_across_batches() {
        let catalog = Arc::new(ScriptedCatalog::new(
            vec![
                Ok(vec![track("a"), track("b")]),
                Ok(vec![track("b"), track("c")]),
                Ok(vec![track("a")]),
                Ok(vec![track("d")]),
            ],
            vec![],
        ));
        let assembler = TrackPoolAssembler::new(catalog);
        let pool = assembler.assemble(&params()).await.unwrap();

        let ids: Vec<&str> = pool.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_batch_failures_are_soft() {
        let api_error = || SpotifyError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        let catalog = Arc::new(ScriptedCatalog::new(
            vec![Err(api_error()), Ok(vec![track("a")]), Err(api_error()), Ok(vec![])],
            vec![],
        ));
        let assembler = TrackPoolAssembler::new(catalog);
        let pool = assembler.assemble(&params()).await.unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_batches_use_search_fallback() {
        let catalog = Arc::new(ScriptedCatalog::new(
            vec![Ok(vec![]), Ok(vec![]), Ok(vec![]), Ok(vec![])],
            vec![Ok(vec![track("s1")]), Ok(vec![track("s2")])],
        ));
        let assembler = TrackPoolAssembler::new(catalog);
        let pool = assembler.assemble(&params()).await.unwrap();
        assert!(!pool.is_empty());
        assert!(pool.iter().any(|t| t.id == "s1"));
    }

    #[tokio::test]
    async fn test_total_exhaustion_surfaces_error() {
        let catalog = Arc::new(ScriptedCatalog::new(
            vec![
                Err(SpotifyError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                }),
                Ok(vec![]),
                Ok(vec![]),
                Ok(vec![]),
            ],
            vec![Ok(vec![]), Ok(vec![]), Ok(vec![])],
        ));
        let assembler = TrackPoolAssembler::new(catalog);
        let err = assembler.assemble(&params()).await.unwrap_err();
        match err {
            SpotifyError::Exhausted(detail) => assert!(detail.contains("503")),
            other => panic!("expected Exhausted, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_requests_stay_within_bounds() {
        let catalog = Arc::new(ScriptedCatalog::new(
            vec![
                Ok(vec![track("a")]),
                Ok(vec![track("b")]),
                Ok(vec![track("c")]),
                Ok(vec![track("d")]),
            ],
            vec![],
        ));
        let assembler = TrackPoolAssembler::new(catalog.clone());
        assembler.assemble(&params()).await.unwrap();

        let requests = catalog.requests_seen.lock().unwrap();
        assert_eq!(requests.len(), RECOMMENDATION_BATCHES);
        for request in requests.iter() {
            assert!((1..=5).contains(&request.seed_genres.len()));
            assert_eq!(request.limit, BATCH_LIMIT);
            let min = request.min_popularity.unwrap();
            let max = request.max_popularity.unwrap();
            assert!((5..=70).contains(&min));
            assert!(max >= min + 10);
            let tempo = request.targets["target_tempo"];
            assert!((40.0..=200.0).contains(&tempo));
            let energy = request.targets["target_energy"];
            assert!((0.0..=1.0).contains(&energy));
        }
    }

    #[test]
    fn test_fallback_query_shape() {
        for _ in 0..20 {
            let (query, offset) = fallback_query("dance");
            assert!(query.starts_with("dance year:"));
            let range = query.strip_prefix("dance year:").unwrap();
            let (start, end) = range.split_once('-').unwrap();
            let start: u32 = start.parse().unwrap();
            let end: u32 = end.parse().unwrap();
            assert!(DECADES.contains(&start));
            assert_eq!(end, start + 9);
            assert!(offset < 50);
        }
    }

    #[tokio::test]
    async fn test_search_fallback_honors_exclusions() {
        let catalog = Arc::new(ScriptedCatalog::new(
            vec![],
            vec![Ok(vec![track("keep"), track("skip")]), Ok(vec![]), Ok(vec![])],
        ));
        let assembler = TrackPoolAssembler::new(catalog);
        let exclusions =
            ExclusionFilter::new(HashSet::from(["skip".to_string()]), HashSet::new());
        let pool = assembler.search_fallback(&params(), &exclusions).await;
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, "keep");
    }
}
