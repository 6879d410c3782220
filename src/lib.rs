//! Melo Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod history;
pub mod llm;
pub mod pool;
pub mod server;
pub mod slots;
pub mod spotify;
pub mod vibe;

// Re-export commonly used types for convenience
pub use pool::{ExclusionFilter, ResultRefiner, TrackPoolAssembler};
pub use server::{make_app, run_server, ServerState};
pub use spotify::{CatalogService, SpotifyClient, Track};
pub use vibe::{ParameterSet, ResolutionOutcome, VibeEngine};
