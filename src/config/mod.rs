mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `remote.api_key`.
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    prepare(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./thumbcache.toml",
        "~/.config/thumbcache/config.toml",
        "/etc/thumbcache/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    prepare(Config::default())
}

fn prepare(mut config: Config) -> Result<Config> {
    apply_env_overrides(&mut config);
    config.cache.media_dir = expand_path(&config.cache.media_dir);
    validate_config(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            config.remote.api_key = Some(key);
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.cache.backend == CacheBackend::Redis && config.cache.redis_url.trim().is_empty() {
        anyhow::bail!("Cache backend 'redis' requires cache.redis_url");
    }

    if config.writeback.capacity == 0 {
        anyhow::bail!("Write-behind capacity must be greater than 0");
    }

    if config.remote.fetch_timeout_secs == 0 {
        anyhow::bail!("Remote fetch timeout must be greater than 0");
    }

    let has_key = config
        .remote
        .api_key
        .as_deref()
        .is_some_and(|key| !key.trim().is_empty());
    if !has_key {
        tracing::warn!(
            "No YouTube API key configured (set remote.api_key or {}); only cached thumbnails will resolve",
            API_KEY_ENV
        );
    }

    Ok(())
}
