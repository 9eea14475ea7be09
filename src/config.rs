use crate::error::{ProxyError, Result};
use crate::upstream::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Deadline for establishing the upstream connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Longest pause allowed between two reads of an upstream response. A slow
    /// archive download that keeps making progress is never cut off.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

/// Advisory `Cache-Control` attached to JSON proxy responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_s_maxage")]
    pub s_maxage: u32,
    #[serde(default = "default_true")]
    pub stale_while_revalidate: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            s_maxage: default_s_maxage(),
            stale_while_revalidate: true,
        }
    }
}

impl UpstreamConfig {
    /// Client for upstream calls. There is no overall deadline, so a relay
    /// runs as long as bytes keep arriving.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .read_timeout(Duration::from_secs(self.read_timeout_secs))
            .build()?;
        Ok(client)
    }
}

impl CacheConfig {
    pub fn header_value(&self) -> String {
        if self.stale_while_revalidate {
            format!("s-maxage={}, stale-while-revalidate", self.s_maxage)
        } else {
            format!("s-maxage={}", self.s_maxage)
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    "DART_API_KEY".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    60
}

fn default_s_maxage() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

/// The DART API key. Never printed, never sent back to callers.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl ProxyConfig {
    /// Load config from a TOML file; absent fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir > built-in defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read the API key from the configured environment variable.
    ///
    /// Called per request: a key added or removed after startup takes effect
    /// on the next request. The value is opaque and used exactly as set; only
    /// an empty value counts as missing.
    pub fn resolve_api_key(&self) -> Result<Credential> {
        match std::env::var(&self.upstream.api_key_env) {
            Ok(key) if !key.is_empty() => Ok(Credential::new(key)),
            _ => Err(ProxyError::config(format!(
                "Environment variable '{}' not set. Set it with your DART API key.",
                self.upstream.api_key_env
            ))),
        }
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("dart-proxy.toml"));

    if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("dart-proxy")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("dart-proxy").join("config.toml"));
        }
        if let Some(home) = home_dir() {
            paths.push(home.join(".config").join("dart-proxy").join("config.toml"));
        }
    }

    if let Some(home) = home_dir() {
        paths.push(home.join(".dart-proxy.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 8080

[upstream]
base_url = "http://127.0.0.1:9999/api"
api_key_env = "MY_DART_KEY"

[cache]
s_maxage = 120
"#
        )
        .unwrap();

        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.upstream.base_url, "http://127.0.0.1:9999/api");
        assert_eq!(config.upstream.api_key_env, "MY_DART_KEY");
        assert_eq!(config.upstream.connect_timeout_secs, 10);
        assert_eq!(config.upstream.read_timeout_secs, 60);
        assert_eq!(
            config.cache.header_value(),
            "s-maxage=120, stale-while-revalidate"
        );
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let f = NamedTempFile::new().unwrap();
        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.upstream.base_url, "https://opendart.fss.or.kr/api");
        assert_eq!(config.upstream.api_key_env, "DART_API_KEY");
        assert!(config.upstream.http_client().is_ok());
        assert_eq!(
            config.cache.header_value(),
            "s-maxage=60, stale-while-revalidate"
        );
    }

    #[test]
    fn test_cache_header_without_revalidate() {
        let cache = CacheConfig {
            s_maxage: 30,
            stale_while_revalidate: false,
        };
        assert_eq!(cache.header_value(), "s-maxage=30");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ProxyConfig::load(Path::new("/nonexistent/dart-proxy.toml")).unwrap_err();
        assert!(matches!(err, ProxyError::Config { .. }));
    }

    #[test]
    fn test_resolve_api_key() {
        let mut config = ProxyConfig::default();
        config.upstream.api_key_env = "DART_PROXY_CONFIG_TEST_KEY".to_string();
        std::env::set_var("DART_PROXY_CONFIG_TEST_KEY", " abc123 ");
        assert_eq!(config.resolve_api_key().unwrap().expose(), " abc123 ");

        config.upstream.api_key_env = "DART_PROXY_CONFIG_TEST_EMPTY".to_string();
        std::env::set_var("DART_PROXY_CONFIG_TEST_EMPTY", "");
        assert!(matches!(
            config.resolve_api_key(),
            Err(ProxyError::Config { .. })
        ));

        config.upstream.api_key_env = "DART_PROXY_CONFIG_TEST_UNSET".to_string();
        assert!(matches!(
            config.resolve_api_key(),
            Err(ProxyError::Config { .. })
        ));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let key = Credential::new("super-secret");
        assert!(!format!("{key:?}").contains("super-secret"));
    }
}
