use anyhow::{Context, Result};
use clap::Parser;
use melo_server::config::{AppConfig, CliConfig, FileConfig};
use melo_server::history::SqliteHistoryStore;
use melo_server::llm::{OpenAiClient, OpenAiConfig};
use melo_server::pool::TrackPoolAssembler;
use melo_server::server::{run_server, ServerState};
use melo_server::spotify::{SpotifyClient, SpotifyCredentials};
use melo_server::vibe::legacy::GenreSeedCache;
use melo_server::vibe::{TemplateIndex, VibeEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override CLI flags.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Host to bind.
    #[clap(long)]
    pub host: Option<String>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// Directory for the history database. History is disabled when unset.
    #[clap(long)]
    pub db_dir: Option<PathBuf>,

    /// Directory for the template embedding cache.
    #[clap(long)]
    pub cache_dir: Option<PathBuf>,

    /// Spotify application client id.
    #[clap(long, env = "SPOTIFY_CLIENT_ID")]
    pub spotify_client_id: Option<String>,

    /// Spotify application client secret.
    #[clap(long, env = "SPOTIFY_CLIENT_SECRET")]
    pub spotify_client_secret: Option<String>,

    /// OpenAI-compatible API key for slot extraction and embeddings.
    #[clap(long, env = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        host: cli_args.host,
        port: cli_args.port,
        db_dir: cli_args.db_dir,
        cache_dir: cli_args.cache_dir,
        spotify_client_id: cli_args.spotify_client_id,
        spotify_client_secret: cli_args.spotify_client_secret,
        openai_api_key: cli_args.openai_api_key,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let credentials = config.spotify.as_ref().map(|s| SpotifyCredentials {
        client_id: s.client_id.clone(),
        client_secret: s.client_secret.clone(),
    });
    if credentials.is_none() {
        warn!("No Spotify credentials configured; catalog requests will fail");
    }
    let catalog = Arc::new(SpotifyClient::new(credentials)?);

    let openai = config.openai.as_ref().map(|settings| {
        let mut openai_config = OpenAiConfig::new(settings.api_key.clone());
        if let Some(base_url) = &settings.base_url {
            openai_config.base_url = base_url.clone();
        }
        if let Some(model) = &settings.model {
            openai_config.model = model.clone();
        }
        if let Some(embedding_model) = &settings.embedding_model {
            openai_config.embedding_model = embedding_model.clone();
        }
        Arc::new(OpenAiClient::new(openai_config))
    });
    if openai.is_none() {
        info!("No OpenAI API key configured; slot extraction and embeddings disabled");
    }

    let embedding_cache_path = config
        .cache_dir
        .as_ref()
        .map(|dir| dir.join("template_embeddings.json"));
    let matcher = TemplateIndex::new(
        openai.clone().map(|c| c as Arc<dyn melo_server::llm::EmbeddingProvider>),
        embedding_cache_path,
    );
    let extractor = openai.map(|c| c as Arc<dyn melo_server::llm::SlotExtractor>);
    let engine = Arc::new(VibeEngine::new(matcher, extractor));

    let history = match &config.db_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create db directory: {:?}", dir))?;
            Some(SqliteHistoryStore::new(dir.join("history.db"))?)
        }
        None => None,
    };

    let state = ServerState {
        engine,
        assembler: Arc::new(TrackPoolAssembler::new(catalog.clone())),
        genre_cache: Arc::new(GenreSeedCache::new(catalog)),
        history,
    };

    run_server(state, &config.host, config.port).await
}
