//! Upstream catalog service abstraction and the Spotify implementation.
//!
//! The recommendation and search endpoints are treated as unreliable: any
//! non-success status is a soft failure that callers route around.

mod client;
mod models;

pub use client::{SpotifyClient, SpotifyCredentials};
pub use models::{RecommendationRequest, Track};

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

/// Errors from the upstream catalog service.
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Spotify credentials not configured")]
    NotConfigured,

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Upstream returned no usable tracks: {0}")]
    Exhausted(String),
}

/// Trait for the upstream recommendation/search provider.
///
/// Implemented by [`SpotifyClient`] in production and by in-memory mocks in
/// tests, so the pool assembly logic never needs the network.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetch recommended tracks for a seed subset and feature targets.
    async fn recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<Track>, SpotifyError>;

    /// Keyword search for tracks. The query may embed filters such as a
    /// `year:1990-1999` range.
    async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Track>, SpotifyError>;

    /// The set of genre seed values the provider accepts.
    async fn available_genre_seeds(&self) -> Result<HashSet<String>, SpotifyError>;
}
