mod file_config;

pub use file_config::{FileConfig, OpenAiConfigSection, SpotifyConfigSection};

use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: u16,
    pub db_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub openai_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub embedding_model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Where the history database lives; history is off when absent.
    pub db_dir: Option<PathBuf>,
    /// Where the template embedding cache lives; cache is off when absent.
    pub cache_dir: Option<PathBuf>,
    /// Upstream catalog credentials; the catalog runs unconfigured without them.
    pub spotify: Option<SpotifySettings>,
    /// LLM credentials; slot extraction and embeddings are off without them.
    pub openai: Option<OpenAiSettings>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let host = file
            .host
            .or_else(|| cli.host.clone())
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = file.port.unwrap_or(cli.port);

        let db_dir = file.db_dir.map(PathBuf::from).or_else(|| cli.db_dir.clone());
        if let Some(dir) = &db_dir {
            if dir.exists() && !dir.is_dir() {
                bail!("db_dir is not a directory: {:?}", dir);
            }
        }
        let cache_dir = file
            .cache_dir
            .map(PathBuf::from)
            .or_else(|| cli.cache_dir.clone());

        let file_spotify = file.spotify.unwrap_or_default();
        let client_id = file_spotify
            .client_id
            .or_else(|| cli.spotify_client_id.clone());
        let client_secret = file_spotify
            .client_secret
            .or_else(|| cli.spotify_client_secret.clone());
        let spotify = match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => Some(SpotifySettings {
                client_id,
                client_secret,
            }),
            (None, None) => None,
            _ => bail!("Spotify credentials require both a client id and a client secret"),
        };

        let file_openai = file.openai.unwrap_or_default();
        let api_key = file_openai.api_key.or_else(|| cli.openai_api_key.clone());
        let openai = api_key.map(|api_key| OpenAiSettings {
            api_key,
            base_url: file_openai.base_url,
            model: file_openai.model,
            embedding_model: file_openai.embedding_model,
        });

        Ok(Self {
            host,
            port,
            db_dir,
            cache_dir,
            spotify,
            openai,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> CliConfig {
        CliConfig {
            port: 3001,
            ..CliConfig::default()
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::resolve(&cli(), None).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3001);
        assert!(config.db_dir.is_none());
        assert!(config.spotify.is_none());
        assert!(config.openai.is_none());
    }

    #[test]
    fn test_toml_overrides_cli() {
        let file: FileConfig = toml::from_str(
            r#"
            port = 8080
            host = "0.0.0.0"

            [spotify]
            client_id = "id"
            client_secret = "secret"
            "#,
        )
        .unwrap();
        let mut cli = cli();
        cli.spotify_client_id = Some("cli-id".to_string());
        cli.spotify_client_secret = Some("cli-secret".to_string());

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.spotify.unwrap().client_id, "id");
    }

    #[test]
    fn test_partial_spotify_credentials_rejected() {
        let mut cli = cli();
        cli.spotify_client_id = Some("id".to_string());
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_openai_section_fills_settings() {
        let file: FileConfig = toml::from_str(
            r#"
            [openai]
            api_key = "sk-test"
            model = "gpt-4o"
            "#,
        )
        .unwrap();
        let config = AppConfig::resolve(&cli(), Some(file)).unwrap();
        let openai = config.openai.unwrap();
        assert_eq!(openai.api_key, "sk-test");
        assert_eq!(openai.model.as_deref(), Some("gpt-4o"));
        assert!(openai.base_url.is_none());
    }
}
