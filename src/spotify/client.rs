//! HTTP client for the Spotify Web API.
//!
//! Handles the client-credentials token exchange (cached with a safety
//! margin before expiry), the recommendations endpoint, keyword search and
//! the available-genre-seeds lookup.

use super::models::{RecommendationRequest, Track};
use super::{CatalogService, SpotifyError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const ACCOUNTS_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Margin subtracted from the token lifetime so we refresh before expiry.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 30;

/// Spotify application credentials for the client-credentials flow.
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Client for the Spotify Web API.
///
/// The bearer token is cached process-wide; a race between two callers can
/// at worst trigger a duplicate refresh, which is idempotent.
pub struct SpotifyClient {
    client: Client,
    credentials: Option<SpotifyCredentials>,
    token_cache: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(credentials: Option<SpotifyCredentials>) -> Result<Self, SpotifyError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SpotifyError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            credentials,
            token_cache: Mutex::new(None),
        })
    }

    /// Get a valid bearer token, refreshing it if the cached one expired.
    async fn bearer_token(&self) -> Result<String, SpotifyError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(SpotifyError::NotConfigured)?;

        let mut cache = self.token_cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        debug!("Refreshing Spotify app token");
        let response = self
            .client
            .post(ACCOUNTS_TOKEN_URL)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| SpotifyError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SpotifyError::TokenExchange(format!(
                "status {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SpotifyError::TokenExchange(e.to_string()))?;

        let lifetime = body
            .expires_in
            .unwrap_or(3600)
            .saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        let token = body.access_token;
        *cache = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });
        Ok(token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<T, SpotifyError> {
        let token = self.bearer_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| SpotifyError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SpotifyError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CatalogService for SpotifyClient {
    async fn recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<Track>, SpotifyError> {
        let mut query: Vec<(String, String)> = vec![
            ("limit".to_string(), request.limit.to_string()),
            (
                "seed_genres".to_string(),
                request.seed_genres.join(","),
            ),
        ];
        for (key, value) in &request.targets {
            query.push((key.clone(), format_target(key, *value)));
        }
        if let Some(min) = request.min_popularity {
            query.push(("min_popularity".to_string(), min.to_string()));
        }
        if let Some(max) = request.max_popularity {
            query.push(("max_popularity".to_string(), max.to_string()));
        }

        let url = format!("{}/recommendations", API_BASE);
        let body: RecommendationsResponse = self.get_json(&url, &query).await?;
        Ok(body.tracks.into_iter().map(Track::from).collect())
    }

    async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Track>, SpotifyError> {
        let url = format!("{}/search", API_BASE);
        let params = vec![
            ("q".to_string(), query.to_string()),
            ("type".to_string(), "track".to_string()),
            ("limit".to_string(), limit.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        let body: SearchResponse = self.get_json(&url, &params).await?;
        let items = body.tracks.map(|t| t.items).unwrap_or_default();
        Ok(items.into_iter().map(Track::from).collect())
    }

    async fn available_genre_seeds(&self) -> Result<HashSet<String>, SpotifyError> {
        let url = format!("{}/recommendations/available-genre-seeds", API_BASE);
        let body: GenreSeedsResponse = self.get_json(&url, &[]).await?;
        if body.genres.is_empty() {
            warn!("Spotify returned an empty genre seed list");
        }
        Ok(body.genres.into_iter().collect())
    }
}

/// Tempo targets are sent as integers-ish BPM values, unit-scale targets
/// with three decimals.
fn format_target(key: &str, value: f64) -> String {
    if key == "target_tempo" {
        format!("{:.1}", value)
    } else {
        format!("{:.3}", value)
    }
}

// Wire types

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    tracks: Vec<ApiTrack>,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: Option<SearchTracks>,
}

#[derive(Deserialize)]
struct SearchTracks {
    #[serde(default)]
    items: Vec<ApiTrack>,
}

#[derive(Deserialize)]
struct GenreSeedsResponse {
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Deserialize)]
struct ApiTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    preview_url: Option<String>,
    external_urls: Option<ApiExternalUrls>,
    album: Option<ApiAlbum>,
    duration_ms: Option<u64>,
}

#[derive(Deserialize)]
struct ApiArtist {
    name: Option<String>,
}

#[derive(Deserialize)]
struct ApiExternalUrls {
    spotify: Option<String>,
}

#[derive(Deserialize)]
struct ApiAlbum {
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Deserialize)]
struct ApiImage {
    url: Option<String>,
}

impl From<ApiTrack> for Track {
    fn from(api: ApiTrack) -> Self {
        Track {
            id: api.id,
            name: api.name,
            artists: api.artists.into_iter().filter_map(|a| a.name).collect(),
            preview_url: api.preview_url,
            external_url: api.external_urls.and_then(|u| u.spotify),
            image_url: api
                .album
                .and_then(|a| a.images.into_iter().next())
                .and_then(|i| i.url),
            duration_ms: api.duration_ms,
        }
    }
}
