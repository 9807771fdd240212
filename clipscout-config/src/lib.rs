//! Loader for clipscout configuration with YAML + environment overlays.
//!
//! Precedence, lowest first:
//!
//! 1. built-in defaults (`upstream.api_key = "${TIKTOK_API_KEY}"`,
//!    `server.site_password = "${SITE_PASSWORD}"`, plus the serde defaults
//!    on every section)
//! 2. YAML files / inline YAML, in the order they were added
//! 3. `CLIPSCOUT__`-prefixed environment variables, `__` as the nesting
//!    separator (`CLIPSCOUT__SEARCH__MAX_PAGES=3`)
//!
//! After merging, every string value goes through one pass of `${VAR}`
//! expansion. Substituted values are taken literally and never expanded
//! again. A secret whose placeholder names an unset variable is treated as
//! absent; any other unresolved string is kept verbatim.
//!
//! ```yaml
//! version: "1"
//! upstream:
//!   base_url: "https://api.scrapecreators.com"
//!   api_key: "${TIKTOK_API_KEY}"
//!   region: "US"
//!   timeout_secs: 15
//! search:
//!   page_size: 30
//!   max_pages: 5
//!   page_timeout_secs: 20
//!   default_publish_time: "this-week"
//!   default_sort_by: "most-liked"
//! server:
//!   host: "127.0.0.1"
//!   port: 3000
//!   site_password: "${SITE_PASSWORD}"
//!   secure_cookie: false
//! logging:
//!   format: "text"
//!   stderr: true
//!   filter: "info"
//! ```
pub use clipscout_common::MAX_PAGES_LIMIT;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::borrow::Cow;
use std::path::Path;

pub const ENV_PREFIX: &str = "CLIPSCOUT";
// Dotted paths dropped to "not configured" when their placeholder is unresolved.
const SECRET_PATHS: &[&str] = &["upstream.api_key", "server.site_password"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClipscoutConfig {
    pub version: Option<String>,
    pub upstream: UpstreamConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Upstream short-video search API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub api_key: Option<String>,
    pub region: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.scrapecreators.com".into(),
            api_key: None,
            region: "US".into(),
            timeout_secs: 15,
        }
    }
}

impl UpstreamConfig {
    pub fn api_key(&self) -> Option<&str> {
        configured_secret(self.api_key.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub page_size: u32,
    pub max_pages: usize,
    /// Per page-call deadline enforced by the orchestrator. `0` is rejected.
    pub page_timeout_secs: u64,
    pub default_publish_time: String,
    pub default_sort_by: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: 30,
            max_pages: 5,
            page_timeout_secs: 20,
            default_publish_time: "this-week".into(),
            default_sort_by: "most-liked".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub site_password: Option<String>,
    /// Adds `Secure` to the session cookie; enable behind HTTPS.
    pub secure_cookie: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            site_password: None,
            secure_cookie: false,
        }
    }
}

impl ServerConfig {
    pub fn site_password(&self) -> Option<&str> {
        configured_secret(self.site_password.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<String>,
    /// `text` or `json`.
    pub format: String,
    pub stderr: bool,
    /// Used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: "text".into(),
            stderr: true,
            filter: "info".into(),
        }
    }
}

/// Semantic problems with an otherwise well-formed configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidConfig {
    #[error("search.page_size must be greater than 0")]
    ZeroPageSize,
    #[error("search.max_pages must be between 1 and {limit}, got {got}")]
    MaxPagesOutOfRange { got: usize, limit: usize },
    #[error("{0} must be greater than 0")]
    ZeroTimeout(&'static str),
    #[error("upstream.base_url must not be empty")]
    EmptyBaseUrl,
}

impl ClipscoutConfig {
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.search.page_size == 0 {
            return Err(InvalidConfig::ZeroPageSize);
        }
        if self.search.max_pages == 0 || self.search.max_pages > MAX_PAGES_LIMIT {
            return Err(InvalidConfig::MaxPagesOutOfRange {
                got: self.search.max_pages,
                limit: MAX_PAGES_LIMIT,
            });
        }
        if self.search.page_timeout_secs == 0 {
            return Err(InvalidConfig::ZeroTimeout("search.page_timeout_secs"));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(InvalidConfig::ZeroTimeout("upstream.timeout_secs"));
        }
        if self.upstream.base_url.trim().is_empty() {
            return Err(InvalidConfig::EmptyBaseUrl);
        }
        Ok(())
    }
}

/// Treat blank values as "not configured". Any other content, `$` and `${`
/// included, is a real secret.
///
/// ```
/// use clipscout_config::configured_secret;
///
/// assert_eq!(configured_secret(Some(" key ")), Some("key"));
/// assert_eq!(configured_secret(Some("s3cr${t")), Some("s3cr${t"));
/// assert_eq!(configured_secret(Some("   ")), None);
/// assert_eq!(configured_secret(None), None);
/// ```
pub fn configured_secret(raw: Option<&str>) -> Option<&str> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value)
}

// Environment values parsed as numbers/bools must still land in string fields.
fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Expand `$VAR`/`${VAR}` in every string once, recording the dotted path of
/// strings that reference an unset variable. Those strings are left as written.
fn expand_env_in_value(v: &mut Value, path: &str, unresolved: &mut Vec<String>) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                match shellexpand::env(s.as_str()).map(Cow::into_owned) {
                    Ok(expanded) => *s = expanded,
                    Err(_) => unresolved.push(path.to_string()),
                }
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter_mut().enumerate() {
                expand_env_in_value(item, &child_path(path, &i.to_string()), unresolved);
            }
        }
        Value::Object(obj) => {
            for (key, item) in obj.iter_mut() {
                expand_env_in_value(item, &child_path(path, key), unresolved);
            }
        }
        _ => {}
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Null out secrets whose placeholder could not be resolved.
fn drop_unresolved_secrets(v: &mut Value, unresolved: &[String]) {
    for path in unresolved {
        if !SECRET_PATHS.contains(&path.as_str()) {
            continue;
        }
        if let Some(slot) = v.pointer_mut(&format!("/{}", path.replace('.', "/"))) {
            *slot = Value::Null;
        }
    }
}

/// Builder hiding the `config` crate wiring.
pub struct ClipscoutConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env: Environment,
}

impl Default for ClipscoutConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipscoutConfigLoader {
    /// Defaults + `CLIPSCOUT__` environment overrides, no files yet.
    ///
    /// ```
    /// use clipscout_config::ClipscoutConfigLoader;
    ///
    /// let cfg = ClipscoutConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nsearch:\n  max_pages: 3")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("1"));
    /// assert_eq!(cfg.search.max_pages, 3);
    /// assert_eq!(cfg.search.page_size, 30);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env: Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        }
    }

    /// Attach a required file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, for env-only deployments.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Replace the process environment with an explicit variable map.
    ///
    /// Keys use the same `CLIPSCOUT__SECTION__FIELD` shape as real variables.
    pub fn with_env_overrides<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.env = self.env.source(Some(map));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and validate.
    pub fn load(self) -> Result<ClipscoutConfig, ConfigError> {
        let cfg = self
            .builder
            .set_default("upstream.api_key", "${TIKTOK_API_KEY}")?
            .set_default("server.site_password", "${SITE_PASSWORD}")?
            .add_source(self.env)
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        let mut unresolved = Vec::new();
        expand_env_in_value(&mut v, "", &mut unresolved);
        drop_unresolved_secrets(&mut v, &unresolved);

        let typed: ClipscoutConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
