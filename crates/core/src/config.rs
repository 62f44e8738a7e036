//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` in the user
//! config directory, then `MARQUEE_*` environment variables. `TMDB_API_KEY`
//! is honoured as a fallback for the API key.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    format::ImageSize,
    saved::SavedStore,
    search::{DEFAULT_QUICK_SEARCH_DEBOUNCE, DEFAULT_SEARCH_DEBOUNCE},
};

/// Directory under the user config dir that holds everything we write.
pub const APP_DIR: &str = "marquee";
/// Default catalog endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.themoviedb.org/3";
/// Default image CDN prefix.
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

const ENV_PREFIX: &str = "MARQUEE";
const API_KEY_FALLBACK_ENV: &str = "TMDB_API_KEY";

const DEFAULT_CONFIG: &str = r#"# Marquee configuration.
# Every key can also be set through the environment, e.g. MARQUEE_API_KEY.

api_base_url = "https://api.themoviedb.org/3"
image_base_url = "https://image.tmdb.org/t/p"
# Read access token from https://www.themoviedb.org/settings/api
# api_key = ""
poster_size = "w500"
search_debounce_ms = 300
quick_search_debounce_ms = 500
"#;

/// Runtime configuration shared by the core and the terminal UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the catalog REST API.
    pub api_base_url: String,
    /// Bearer token sent with every catalog request.
    pub api_key: Option<String>,
    /// Prefix used to derive poster and backdrop URLs.
    pub image_base_url: String,
    /// Poster size segment used in image URLs.
    pub poster_size: ImageSize,
    /// Quiet period before a typed query drives the paginated search.
    pub search_debounce_ms: u64,
    /// Quiet period used by the single-page search screen.
    pub quick_search_debounce_ms: u64,
    /// Location of the saved-movies file.
    pub saved_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            poster_size: ImageSize::W500,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64,
            quick_search_debounce_ms: DEFAULT_QUICK_SEARCH_DEBOUNCE.as_millis() as u64,
            saved_path: SavedStore::default_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration, reading `path` if it exists.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_layered(
            path.as_ref(),
            config::Environment::with_prefix(ENV_PREFIX),
            env::var(API_KEY_FALLBACK_ENV).ok(),
        )
    }

    /// Defaults, then the file at `path`, then `environment`. `fallback_key`
    /// fills in an absent or empty API key.
    fn load_layered(
        path: &Path,
        environment: config::Environment,
        fallback_key: Option<String>,
    ) -> Result<Self> {
        let defaults = AppConfig::default();
        let settings = config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("image_base_url", defaults.image_base_url)?
            .set_default("poster_size", defaults.poster_size.as_str())?
            .set_default("search_debounce_ms", defaults.search_debounce_ms)?
            .set_default("quick_search_debounce_ms", defaults.quick_search_debounce_ms)?
            .set_default(
                "saved_path",
                defaults.saved_path.to_string_lossy().into_owned(),
            )?
            .add_source(config::File::from(path).required(false))
            .add_source(environment.try_parsing(true))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;

        let mut loaded: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        if loaded.api_key.as_deref().map_or(true, str::is_empty) {
            loaded.api_key = fallback_key.filter(|value| !value.trim().is_empty());
        }
        loaded.api_base_url = loaded.api_base_url.trim_end_matches('/').to_string();
        loaded.image_base_url = loaded.image_base_url.trim_end_matches('/').to_string();

        Ok(loaded)
    }

    /// Debounce window for the paginated search.
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Debounce window for the single-page search.
    pub fn quick_search_debounce(&self) -> Duration {
        Duration::from_millis(self.quick_search_debounce_ms)
    }
}

/// Directory holding the config file and saved movies.
pub fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Path of the configuration file.
pub fn config_path() -> PathBuf {
    config_root().join("config.toml")
}

/// Write the commented default configuration if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::saved::SAVED_FILE;

    /// Environment layer reading `vars` instead of the process environment.
    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(vars))
    }

    #[test]
    fn default_file_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path)?;
        assert!(path.exists());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.image_base_url, DEFAULT_IMAGE_BASE_URL);
        assert_eq!(config.poster_size, ImageSize::W500);
        assert_eq!(config.search_debounce(), Duration::from_millis(300));
        assert_eq!(config.quick_search_debounce(), Duration::from_millis(500));
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_base_url = \"http://localhost:9000/3/\"\nposter_size = \"original\"\nsearch_debounce_ms = 120\napi_key = \"token\"\n",
        )?;

        let config = AppConfig::load_layered(&path, environment(&[]), None)?;
        assert_eq!(config.api_base_url, "http://localhost:9000/3");
        assert_eq!(config.poster_size, ImageSize::Original);
        assert_eq!(config.search_debounce_ms, 120);
        assert_eq!(config.api_key.as_deref(), Some("token"));
        Ok(())
    }

    #[test]
    fn existing_config_is_not_overwritten() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "search_debounce_ms = 42\n")?;
        write_default_config(&path)?;
        assert_eq!(fs::read_to_string(&path)?, "search_debounce_ms = 42\n");
        Ok(())
    }

    #[test]
    fn environment_overrides_file_values() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"file-token\"\nsearch_debounce_ms = 120\n")?;

        let env = environment(&[
            ("MARQUEE_API_KEY", "env-token"),
            ("MARQUEE_SEARCH_DEBOUNCE_MS", "250"),
            ("UNRELATED_API_KEY", "ignored"),
        ]);
        let config = AppConfig::load_layered(&path, env, Some("fallback".to_string()))?;
        assert_eq!(config.api_key.as_deref(), Some("env-token"));
        assert_eq!(config.search_debounce_ms, 250);
        assert_eq!(config.quick_search_debounce_ms, 500);
        Ok(())
    }

    #[test]
    fn empty_api_key_falls_back() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"\"\n")?;

        let config =
            AppConfig::load_layered(&path, environment(&[]), Some("fallback-token".to_string()))?;
        assert_eq!(config.api_key.as_deref(), Some("fallback-token"));

        let missing = dir.path().join("missing.toml");
        let config = AppConfig::load_layered(&missing, environment(&[]), Some("  ".to_string()))?;
        assert_eq!(config.api_key, None);
        Ok(())
    }

    #[test]
    fn configured_api_key_wins_over_fallback() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"token\"\n")?;

        let config = AppConfig::load_layered(&path, environment(&[]), Some("other".to_string()))?;
        assert_eq!(config.api_key.as_deref(), Some("token"));
        Ok(())
    }

    #[test]
    fn saved_movies_default_to_the_config_directory() {
        let config = AppConfig::default();
        assert_eq!(config.saved_path, SavedStore::default_path());
        assert!(config.saved_path.ends_with(Path::new(APP_DIR).join(SAVED_FILE)));
    }
}
