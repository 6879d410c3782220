use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_dir: Option<String>,
    pub cache_dir: Option<String>,

    // Upstream credentials
    pub spotify: Option<SpotifyConfigSection>,
    pub openai: Option<OpenAiConfigSection>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpotifyConfigSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct OpenAiConfigSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub embedding_model: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
