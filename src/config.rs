use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable that overrides `media.private_key`.
pub const MEDIA_KEY_ENV: &str = "SNAPFEED_MEDIA_PRIVATE_KEY";

#[derive(Parser, Debug)]
#[command(name = "snapfeed", about = "A small photo and video feed backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    pub reset_token_minutes: u64,
    pub verify_token_minutes: u64,
    /// bcrypt work factor for stored password hashes
    pub password_cost: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MediaConfig {
    pub upload_url: String,
    pub private_key: Option<String>,
    pub timeout_secs: u64,
    pub tags: Vec<String>,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "snapfeed_session".to_string(),
            session_hours: 1,
            reset_token_minutes: 60,
            verify_token_minutes: 60,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_url: "https://upload.imagekit.io/api/v1/files/upload".to_string(),
            private_key: None,
            timeout_secs: 60,
            tags: vec!["post_image".to_string()],
            max_upload_mb: 100,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("snapfeed.db"));
        }

        Ok(config)
    }

    /// Pull secrets that should not live in the config file from the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(MEDIA_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.media.private_key = Some(key);
        }
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".snapfeed")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("snapfeed.db"))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.media.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
