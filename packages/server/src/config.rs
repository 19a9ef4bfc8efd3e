use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens. Default: 168 (7 days).
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

/// Which blob store backend holds uploaded videos.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Memory,
    S3,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    pub endpoint: String,
    #[serde(default)]
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Client-side retry count for transient failures. Default: 3.
    #[serde(default = "default_s3_retries")]
    pub retries: u8,
}

fn default_s3_retries() -> u8 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend. Default: "./data/videos".
    #[serde(default = "default_filesystem_path")]
    pub filesystem_path: PathBuf,
    /// Largest accepted video, in bytes. Default: 256 MiB.
    #[serde(default = "default_max_video_size")]
    pub max_video_size: u64,
    /// Most files accepted by one upload request. Default: 5.
    #[serde(default = "default_max_videos_per_upload")]
    pub max_videos_per_upload: usize,
    pub s3: Option<S3Config>,
}

fn default_filesystem_path() -> PathBuf {
    PathBuf::from("./data/videos")
}
fn default_max_video_size() -> u64 {
    256 * 1024 * 1024
}
fn default_max_videos_per_upload() -> usize {
    5
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            filesystem_path: default_filesystem_path(),
            max_video_size: default_max_video_size(),
            max_videos_per_upload: default_max_videos_per_upload(),
            s3: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., FORMLOG__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("FORMLOG").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
