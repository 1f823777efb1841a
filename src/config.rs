use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BazaarError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("BAZAAR_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("bazaar/config.toml"))
    }

    fn load_project(root: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&root.join(".bazaar/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| BazaarError::Config(format!("read config {}: {err}", path.display())))?;
        Self::parse_patch(&raw, path).map(Some)
    }

    fn parse_patch(raw: &str, origin: &Path) -> Result<ConfigPatch> {
        toml::from_str(raw)
            .map_err(|err| BazaarError::Config(format!("parse config {}: {err}", origin.display())))
    }

    /// Parse a full config from TOML text on top of the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config = Self::default();
        config.merge_patch(Self::parse_patch(raw, Path::new("<inline>"))?);
        config.validate()?;
        Ok(config)
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.database {
            self.database.merge(patch);
        }
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("BAZAAR_DATABASE_PATH") {
            self.database.path = PathBuf::from(value);
        }

        if let Some(value) = env_i64("BAZAAR_SEARCH_DEFAULT_LIMIT")? {
            self.search.default_limit = value;
        }
        if let Some(value) = env_i64("BAZAAR_SEARCH_MAX_LIMIT")? {
            self.search.max_limit = value;
        }
        if let Some(value) = env_f64("BAZAAR_SEARCH_SIMILARITY_THRESHOLD")? {
            self.search.similarity_threshold = value;
        }
        if let Some(value) = env_f64("BAZAAR_SEARCH_WORD_SIMILARITY_THRESHOLD")? {
            self.search.word_similarity_threshold = value;
        }
        if let Some(value) = env_string("BAZAAR_SEARCH_UNKNOWN_FILTERS") {
            self.search.unknown_filters = parse_unknown_filters(&value)?;
        }
        if let Some(value) = env_string("BAZAAR_SEARCH_RELEVANCE_PAGING") {
            self.search.relevance_paging = parse_relevance_paging(&value)?;
        }
        if let Some(value) = env_duration("BAZAAR_SEARCH_QUERY_TIMEOUT")? {
            self.search.query_timeout = value;
        }

        if let Some(value) = env_duration("BAZAAR_CACHE_TTL")? {
            self.cache.ttl = value;
        }
        if let Some(value) = env_duration("BAZAAR_CACHE_SWEEP_INTERVAL")? {
            self.cache.sweep_interval = value;
        }
        if let Some(value) = env_string("BAZAAR_CACHE_SECRET") {
            self.cache.secret = Some(value);
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.search.max_limit <= 0 {
            return Err(BazaarError::Config(format!(
                "search.max_limit must be positive (got {})",
                self.search.max_limit
            )));
        }
        if self.search.default_limit <= 0 || self.search.default_limit > self.search.max_limit {
            return Err(BazaarError::Config(format!(
                "search.default_limit must be in 1..={} (got {})",
                self.search.max_limit, self.search.default_limit
            )));
        }
        for (key, value) in [
            ("search.similarity_threshold", self.search.similarity_threshold),
            ("search.word_similarity_threshold", self.search.word_similarity_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BazaarError::Config(format!("{key} must be in 0..=1 (got {value})")));
            }
        }
        if self.cache.ttl.is_zero() || self.cache.sweep_interval.is_zero() {
            return Err(BazaarError::Config(
                "cache.ttl and cache.sweep_interval must be non-zero".to_string(),
            ));
        }
        if self.cache.sweep_batch == 0 {
            return Err(BazaarError::Config("cache.sweep_batch must be positive".to_string()));
        }
        if let Some(secret) = &self.cache.secret {
            let bytes = hex::decode(secret)
                .map_err(|err| BazaarError::Config(format!("cache.secret must be hex: {err}")))?;
            if bytes.len() < 32 {
                return Err(BazaarError::Config(format!(
                    "cache.secret must be at least 32 bytes (got {})",
                    bytes.len()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|dir| dir.join("bazaar/listings.db"))
            .unwrap_or_else(|| PathBuf::from(".bazaar/listings.db"));
        Self { path }
    }
}

impl DatabaseConfig {
    fn merge(&mut self, patch: DatabasePatch) {
        if let Some(value) = patch.path {
            self.path = value;
        }
    }
}

/// What to do with a filter whose role this build does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFilterPolicy {
    /// Skip the filter and log a warning.
    #[default]
    Ignore,
    /// Fail the request with `UnknownFilterRole`.
    Reject,
}

/// How cursors bound a relevance-ranked scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevancePaging {
    /// Exact `(rank, id)` keyset predicate against the cursor row.
    #[default]
    Keyset,
    /// Same bounded query shape without a cursor exclusion predicate.
    Approximate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub default_limit: i64,
    #[serde(default)]
    pub max_limit: i64,
    #[serde(default)]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub word_similarity_threshold: f64,
    #[serde(default)]
    pub unknown_filters: UnknownFilterPolicy,
    #[serde(default)]
    pub relevance_paging: RelevancePaging,
    #[serde(default, with = "humantime_serde")]
    pub query_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            similarity_threshold: 0.3,
            word_similarity_threshold: 0.6,
            unknown_filters: UnknownFilterPolicy::Ignore,
            relevance_paging: RelevancePaging::Keyset,
            query_timeout: Duration::from_secs(5),
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.default_limit {
            self.default_limit = value;
        }
        if let Some(value) = patch.max_limit {
            self.max_limit = value;
        }
        if let Some(value) = patch.similarity_threshold {
            self.similarity_threshold = value;
        }
        if let Some(value) = patch.word_similarity_threshold {
            self.word_similarity_threshold = value;
        }
        if let Some(value) = patch.unknown_filters {
            self.unknown_filters = value;
        }
        if let Some(value) = patch.relevance_paging {
            self.relevance_paging = value;
        }
        if let Some(value) = patch.query_timeout {
            self.query_timeout = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default, with = "humantime_serde")]
    pub ttl: Duration,
    #[serde(default, with = "humantime_serde")]
    pub sweep_interval: Duration,
    #[serde(default)]
    pub sweep_batch: usize,
    /// Hex-encoded HMAC key. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            sweep_batch: 512,
            secret: None,
        }
    }
}

impl CacheConfig {
    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.ttl {
            self.ttl = value;
        }
        if let Some(value) = patch.sweep_interval {
            self.sweep_interval = value;
        }
        if let Some(value) = patch.sweep_batch {
            self.sweep_batch = value;
        }
        if let Some(value) = patch.secret {
            self.secret = Some(value);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub database: Option<DatabasePatch>,
    pub search: Option<SearchPatch>,
    pub cache: Option<CachePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabasePatch {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub default_limit: Option<i64>,
    pub max_limit: Option<i64>,
    pub similarity_threshold: Option<f64>,
    pub word_similarity_threshold: Option<f64>,
    pub unknown_filters: Option<UnknownFilterPolicy>,
    pub relevance_paging: Option<RelevancePaging>,
    #[serde(default, with = "humantime_serde::option")]
    pub query_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    #[serde(default, with = "humantime_serde::option")]
    pub ttl: Option<Duration>,
    #[serde(default, with = "humantime_serde::option")]
    pub sweep_interval: Option<Duration>,
    pub sweep_batch: Option<usize>,
    pub secret: Option<String>,
}

fn parse_unknown_filters(value: &str) -> Result<UnknownFilterPolicy> {
    match value.to_lowercase().as_str() {
        "ignore" | "lenient" => Ok(UnknownFilterPolicy::Ignore),
        "reject" | "strict" => Ok(UnknownFilterPolicy::Reject),
        _ => Err(BazaarError::Config(format!(
            "invalid unknown filter policy {value} (expected ignore|reject)"
        ))),
    }
}

fn parse_relevance_paging(value: &str) -> Result<RelevancePaging> {
    match value.to_lowercase().as_str() {
        "keyset" => Ok(RelevancePaging::Keyset),
        "approximate" => Ok(RelevancePaging::Approximate),
        _ => Err(BazaarError::Config(format!(
            "invalid relevance paging mode {value} (expected keyset|approximate)"
        ))),
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_i64(key: &str) -> Result<Option<i64>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<i64>().map(Some).map_err(|err| {
            BazaarError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<f64>().map(Some).map_err(|err| {
            BazaarError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_duration(key: &str) -> Result<Option<Duration>> {
    match std::env::var(key) {
        Ok(value) => humantime_serde::re::humantime::parse_duration(&value)
            .map(Some)
            .map_err(|err| BazaarError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}
