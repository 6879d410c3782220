//! HTTP surface: vibe resolution, the legacy mood endpoint, and history.

use crate::history::SqliteHistoryStore;
use crate::pool::{ExclusionFilter, ResultRefiner, TrackPoolAssembler};
use crate::spotify::{SpotifyError, Track};
use crate::vibe::legacy::{normalize_seed_genres, GenreSeedCache};
use crate::vibe::{ParameterSet, ResolutionOutcome, VibeEngine};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<VibeEngine>,
    pub assembler: Arc<TrackPoolAssembler>,
    pub genre_cache: Arc<GenreSeedCache>,
    pub history: Option<SqliteHistoryStore>,
}

#[derive(Deserialize, Debug)]
struct VibeRequest {
    phrase: String,
    emoji: Option<String>,
    user_id: Option<String>,
    exclude_ids: Option<Vec<String>>,
    exclude_keys: Option<Vec<String>>,
}

#[derive(Serialize)]
struct VibeResponse {
    source: &'static str,
    targets: BTreeMap<String, f64>,
    seed_genres: Vec<String>,
    tracks: Vec<Track>,
    meta: serde_json::Value,
}

#[derive(Deserialize, Debug)]
struct MoodRequest {
    mood: Option<String>,
    emoji: Option<String>,
    user_id: Option<String>,
}

#[derive(Serialize)]
struct PlaylistResponse {
    params: ParameterSet,
    tracks: Vec<Track>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    user_id: String,
}

fn bad_request(detail: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
}

fn upstream_error(e: SpotifyError) -> Response {
    error!(error = %e, "Upstream catalog failure");
    let status = match e {
        SpotifyError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "detail": e.to_string() }))).into_response()
}

/// Re-validate seed genres against the provider's known-valid set.
///
/// Only the lexical tiers go through this: structured-slot seeds carry
/// style hints (e.g. "chanson") the provider's seed list would drop.
async fn normalize_outcome_seeds(state: &ServerState, outcome: &mut ResolutionOutcome) {
    let params = match outcome {
        ResolutionOutcome::Slots { .. } => return,
        ResolutionOutcome::Template { params, .. } => params,
        ResolutionOutcome::Legacy { params } => params,
    };
    let valid = state.genre_cache.valid_seeds().await;
    params.seed_genres = normalize_seed_genres(&params.seed_genres, valid.as_ref());
}

fn save_history(
    state: &ServerState,
    user_id: Option<&str>,
    mood_text: &str,
    params: &ParameterSet,
    tracks: &[Track],
) {
    let (Some(store), Some(user_id)) = (&state.history, user_id) else {
        return;
    };
    if let Err(e) = store.save(user_id, mood_text, params, tracks) {
        warn!(user_id, error = %e, "Failed to save history entry");
    }
}

async fn vibe(State(state): State<ServerState>, Json(body): Json<VibeRequest>) -> Response {
    let phrase = body.phrase.trim();
    if phrase.is_empty() && body.emoji.is_none() {
        return bad_request("Phrase is required");
    }
    info!(phrase, user_id = ?body.user_id, "Resolving vibe");

    let mut outcome = state.engine.resolve(phrase, body.emoji.as_deref()).await;
    normalize_outcome_seeds(&state, &mut outcome).await;

    let exclusions = ExclusionFilter::new(
        body.exclude_ids.unwrap_or_default().into_iter().collect(),
        body.exclude_keys.unwrap_or_default().into_iter().collect(),
    );

    let pool = match state.assembler.assemble(outcome.params()).await {
        Ok(pool) => pool,
        Err(e) => return upstream_error(e),
    };
    let tracks = ResultRefiner::new(&state.assembler)
        .refine(pool, outcome.params(), &exclusions)
        .await;

    save_history(
        &state,
        body.user_id.as_deref(),
        phrase,
        outcome.params(),
        &tracks,
    );

    let source = outcome.strategy();
    let meta = match &outcome {
        ResolutionOutcome::Slots { slots, .. } => {
            json!({ "source": "structured_slots", "slots": slots })
        }
        ResolutionOutcome::Template { diagnostics, .. } => {
            let mut meta = serde_json::to_value(diagnostics).unwrap_or(serde_json::Value::Null);
            if let Some(map) = meta.as_object_mut() {
                map.insert("source".to_string(), json!("template_engine"));
            }
            meta
        }
        ResolutionOutcome::Legacy { .. } => json!({ "source": "legacy_rules" }),
    };

    info!(
        phrase,
        source,
        track_count = tracks.len(),
        "Vibe resolved"
    );

    let params = outcome.params();
    Json(VibeResponse {
        source,
        targets: params.targets.clone(),
        seed_genres: params.seed_genres.clone(),
        tracks,
        meta,
    })
    .into_response()
}

async fn mood_to_playlist(
    State(state): State<ServerState>,
    Json(body): Json<MoodRequest>,
) -> Response {
    let mood = body.mood.as_deref().unwrap_or("").trim().to_string();
    if mood.is_empty() && body.emoji.is_none() {
        return bad_request("Provide mood or emoji");
    }

    let mut outcome = state
        .engine
        .resolve_lexical(&mood, body.emoji.as_deref())
        .await;
    normalize_outcome_seeds(&state, &mut outcome).await;

    let tracks = match state.assembler.assemble(outcome.params()).await {
        Ok(tracks) => tracks,
        Err(e) => return upstream_error(e),
    };

    let text = if mood.is_empty() {
        body.emoji.clone().unwrap_or_default()
    } else {
        mood.clone()
    };
    save_history(&state, body.user_id.as_deref(), &text, outcome.params(), &tracks);

    Json(PlaylistResponse {
        params: outcome.params().clone(),
        tracks,
    })
    .into_response()
}

async fn get_history(
    State(state): State<ServerState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let Some(store) = &state.history else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "History storage is not configured" })),
        )
            .into_response();
    };
    match store.list_for_user(&query.user_id) {
        Ok(items) => Json(items).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read history");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

pub fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/api/vibe", post(vibe))
        .route("/api/mood-to-playlist", post(mood_to_playlist))
        .route("/api/moods/history", get(get_history))
        .route("/api/health", get(health))
        .with_state(state)
}

pub async fn run_server(state: ServerState, host: &str, port: u16) -> Result<()> {
    let app = make_app(state);
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    info!("Listening on {host}:{port}");
    Ok(axum::serve(listener, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::{CatalogService, RecommendationRequest};
    use crate::vibe::TemplateIndex;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::collections::HashSet;
    use tower::ServiceExt;

    struct FixedCatalog {
        tracks: Vec<Track>,
    }

    #[async_trait]
    impl CatalogService for FixedCatalog {
        async fn recommendations(
            &self,
            _request: &RecommendationRequest,
        ) -> Result<Vec<Track>, SpotifyError> {
            Ok(self.tracks.clone())
        }

        async fn search_tracks(
            &self,
            _query: &str,
            _limit: u32,
            _offset: u32,
        ) -> Result<Vec<Track>, SpotifyError> {
            Ok(Vec::new())
        }

        async fn available_genre_seeds(&self) -> Result<HashSet<String>, SpotifyError> {
            Ok(HashSet::new())
        }
    }

    fn sample_tracks(count: usize) -> Vec<Track> {
        (0..count)
            .map(|i| Track {
                id: format!("t{i}"),
                name: format!("Track {i}"),
                artists: vec!["Artist".to_string()],
                preview_url: None,
                external_url: None,
                image_url: None,
                duration_ms: Some(180_000),
            })
            .collect()
    }

    fn app_with_tracks(tracks: Vec<Track>) -> Router {
        let catalog = Arc::new(FixedCatalog { tracks });
        make_app(ServerState {
            engine: Arc::new(VibeEngine::new(TemplateIndex::new(None, None), None)),
            assembler: Arc::new(TrackPoolAssembler::new(catalog.clone())),
            genre_cache: Arc::new(GenreSeedCache::new(catalog)),
            history: None,
        })
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_vibe_requires_phrase_or_emoji() {
        let app = app_with_tracks(sample_tracks(25));
        let (status, body) = post_json(app, "/api/vibe", json!({ "phrase": "  " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Phrase is required");
    }

    #[tokio::test]
    async fn test_vibe_resolves_template_phrase() {
        let app = app_with_tracks(sample_tracks(25));
        let (status, body) = post_json(
            app,
            "/api/vibe",
            json!({ "phrase": "safari adventure in madagascar" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "template");
        assert_eq!(body["meta"]["template_id"], "afro_safari_adventure");
        assert_eq!(body["seed_genres"][0], "afrobeat");
        assert_eq!(body["tracks"].as_array().unwrap().len(), 25);
    }

    #[tokio::test]
    async fn test_vibe_applies_exclusions() {
        let app = app_with_tracks(sample_tracks(25));
        let (status, body) = post_json(
            app,
            "/api/vibe",
            json!({ "phrase": "late night coding", "exclude_ids": ["t0", "t1"] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body["tracks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert!(!ids.contains(&"t0"));
        assert!(!ids.contains(&"t1"));
    }

    #[tokio::test]
    async fn test_vibe_exhaustion_maps_to_bad_gateway() {
        let app = app_with_tracks(Vec::new());
        let (status, _) = post_json(app, "/api/vibe", json!({ "phrase": "anything" })).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_mood_to_playlist_legacy_path() {
        let app = app_with_tracks(sample_tracks(5));
        let (status, body) =
            post_json(app, "/api/mood-to-playlist", json!({ "mood": "chill" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["params"]["seed_genres"][0], "chill");
        assert_eq!(body["tracks"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_history_unconfigured_returns_service_unavailable() {
        let app = app_with_tracks(sample_tracks(1));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/moods/history?user_id=u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_history_round_trip_through_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistoryStore::new(dir.path().join("history.db")).unwrap();
        let catalog = Arc::new(FixedCatalog {
            tracks: sample_tracks(3),
        });
        let app = make_app(ServerState {
            engine: Arc::new(VibeEngine::new(TemplateIndex::new(None, None), None)),
            assembler: Arc::new(TrackPoolAssembler::new(catalog.clone())),
            genre_cache: Arc::new(GenreSeedCache::new(catalog)),
            history: Some(store),
        });

        let (status, _) = post_json(
            app.clone(),
            "/api/mood-to-playlist",
            json!({ "mood": "happy", "user_id": "u1" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/moods/history?user_id=u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let items: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(items.as_array().unwrap().len(), 1);
        assert_eq!(items[0]["mood_text"], "happy");
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with_tracks(Vec::new());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
