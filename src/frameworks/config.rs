use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SESSION_FILE: &str = ".storefront/session.json";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CONFIG_FILE: &str = "storefront.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// Runtime settings for the client (not per-user state).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

// Shape of storefront.toml; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_base_url: Option<String>,
    session_file: Option<PathBuf>,
    request_timeout_ms: Option<u64>,
}

impl ClientConfig {
    // Defaults, then the TOML file, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let lookup = |key: &str| env::var(key).ok();
        let path = lookup("STOREFRONT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path, lookup)
    }

    pub fn load_from(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(file) = read_file_config(path)? {
            config.apply_file(file);
        }
        config.apply_env(lookup);
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(url) = file.api_base_url {
            self.api_base_url = url;
        }
        if let Some(session_file) = file.session_file {
            self.session_file = session_file;
        }
        if let Some(ms) = file.request_timeout_ms {
            self.request_timeout = Duration::from_millis(ms);
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("STOREFRONT_API_URL").filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(session_file) = lookup("STOREFRONT_SESSION_FILE").filter(|v| !v.is_empty()) {
            self.session_file = PathBuf::from(session_file);
        }
        // Unparseable values fall back to whatever is already configured.
        if let Some(ms) = lookup("STOREFRONT_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.request_timeout = Duration::from_millis(ms);
        }
    }
}

fn read_file_config(path: &Path) -> Result<Option<FileConfig>, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&raw)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
