use anyhow::{Context, Result};
use nightspot_core::models::Tier;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_ENDPOINT: &str = "AOAI_ENDPOINT";
pub const ENV_API_KEY: &str = "AOAI_API_KEY";
pub const ENV_DEPLOYMENT: &str = "AOAI_DEPLOYMENT";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_path")]
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
        }
    }
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("./data/venues.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_preferred_tier")]
    pub preferred_tier: Tier,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default)]
    pub disable_embedding: bool,
    #[serde(default = "default_tfidf_max_features")]
    pub tfidf_max_features: Option<usize>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            preferred_tier: default_preferred_tier(),
            default_top_k: default_top_k(),
            disable_embedding: false,
            tfidf_max_features: default_tfidf_max_features(),
        }
    }
}

fn default_preferred_tier() -> Tier {
    Tier::Embedding
}
fn default_top_k() -> usize {
    5
}
fn default_tfidf_max_features() -> Option<usize> {
    Some(nightspot_core::similarity::tfidf::DEFAULT_MAX_FEATURES)
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeoConfig {
    #[serde(default)]
    pub default_radius_km: Option<f64>,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            default_radius_km: None,
            default_top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            credential: None,
            deployment: None,
            api_version: default_api_version(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

fn default_api_version() -> String {
    "2024-02-15-preview".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_attempts() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_backoff_base_ms() -> u64 {
    250
}

/// Largest accepted `embedding.backoff_base_ms`.
pub const MAX_BACKOFF_BASE_MS: u64 = 60_000;

impl EmbeddingConfig {
    /// The first missing setting, for diagnostics.
    pub fn missing(&self) -> Option<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if blank(&self.endpoint) {
            Some("embedding.endpoint")
        } else if blank(&self.credential) {
            Some("embedding.credential")
        } else if blank(&self.deployment) {
            Some("embedding.deployment")
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Fill unset embedding settings from a variable lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.is_none() {
                *slot = lookup(key).filter(|v| !v.trim().is_empty());
            }
        };
        fill(&mut self.embedding.endpoint, ENV_ENDPOINT);
        fill(&mut self.embedding.credential, ENV_API_KEY);
        fill(&mut self.embedding.deployment, ENV_DEPLOYMENT);
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let mut config = parse_config(&content)?;
    config.apply_env();
    Ok(config)
}

/// Like [`load_config`], but a missing file yields defaults.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_config(path);
    }
    tracing::debug!(path = %path.display(), "config file not found, using defaults");
    let mut config = Config::default();
    config.apply_env();
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.retrieval.default_top_k == 0 {
        anyhow::bail!("retrieval.default_top_k must be >= 1");
    }
    if config.geo.default_top_k == 0 {
        anyhow::bail!("geo.default_top_k must be >= 1");
    }
    if let Some(r) = config.geo.default_radius_km {
        if !r.is_finite() || r < 0.0 {
            anyhow::bail!("geo.default_radius_km must be a non-negative number");
        }
    }
    if config.retrieval.tfidf_max_features == Some(0) {
        anyhow::bail!("retrieval.tfidf_max_features must be > 0 when set");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    if config.embedding.max_attempts == 0 {
        anyhow::bail!("embedding.max_attempts must be >= 1");
    }
    if config.embedding.timeout_secs == 0 {
        anyhow::bail!("embedding.timeout_secs must be > 0");
    }
    if config.embedding.backoff_base_ms > MAX_BACKOFF_BASE_MS {
        anyhow::bail!(
            "embedding.backoff_base_ms must be <= {}",
            MAX_BACKOFF_BASE_MS
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.retrieval.preferred_tier, Tier::Embedding);
        assert_eq!(config.retrieval.default_top_k, 5);
        assert_eq!(config.geo.default_radius_km, None);
        assert_eq!(config.embedding.max_attempts, 3);
        assert_eq!(config.embedding.timeout_secs, 5);
        assert_eq!(config.server.bind, "127.0.0.1:7341");
        assert_eq!(config.embedding.missing(), Some("embedding.endpoint"));
    }

    #[test]
    fn test_parse_sections() {
        let config = parse_config(
            r#"
[corpus]
path = "venues.json"

[retrieval]
preferred_tier = "tf-idf"
default_top_k = 3

[geo]
default_radius_km = 3.0

[embedding]
endpoint = "https://example.openai.azure.com"
credential = "secret"
deployment = "text-embedding-3-small"
"#,
        )
        .unwrap();
        assert_eq!(config.corpus.path, PathBuf::from("venues.json"));
        assert_eq!(config.retrieval.preferred_tier, Tier::Tfidf);
        assert_eq!(config.geo.default_radius_km, Some(3.0));
        assert_eq!(config.embedding.missing(), None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(parse_config("[retrieval]\ndefault_top_k = 0\n").is_err());
        assert!(parse_config("[geo]\ndefault_radius_km = -1.0\n").is_err());
        assert!(parse_config("[embedding]\nmax_attempts = 0\n").is_err());
        assert!(parse_config("[embedding]\nbackoff_base_ms = 60001\n").is_err());
        assert!(parse_config("[embedding]\nbackoff_base_ms = 60000\n").is_ok());
        assert!(parse_config("[retrieval]\npreferred_tier = \"bm25\"\n").is_err());
    }

    #[test]
    fn test_env_fills_only_unset_values() {
        let mut config = parse_config("[embedding]\nendpoint = \"https://file\"\n").unwrap();
        config.apply_env_with(|key| match key {
            ENV_ENDPOINT => Some("https://env".to_string()),
            ENV_API_KEY => Some("key".to_string()),
            ENV_DEPLOYMENT => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.embedding.endpoint.as_deref(), Some("https://file"));
        assert_eq!(config.embedding.credential.as_deref(), Some("key"));
        assert_eq!(config.embedding.deployment, None);
        assert_eq!(config.embedding.missing(), Some("embedding.deployment"));
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse_config(include_str!("../config/spot.example.toml")).unwrap();
        assert_eq!(config.geo.default_radius_km, Some(3.0));
        assert_eq!(config.retrieval.tfidf_max_features, Some(20_000));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.retrieval.default_top_k, 5);
    }
}
