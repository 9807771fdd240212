use anyhow::{Context, Result};
use clipscout_common::observability::{LogConfig, LogFormat};
use clipscout_config::{ClipscoutConfig, ClipscoutConfigLoader, LoggingConfig};
use clipscout_search::{PublishTime, SearchOrchestrator, SearchSettings};
use clipscout_server::{AppState, SearchDefaults, SiteGate};
use clipscout_social::tiktok::TikTokApi;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "clipscout.yaml";

/// Load configuration. An explicit path must exist; the default file is
/// optional. Environment overrides always win.
pub fn load_config(path: Option<&Path>) -> Result<ClipscoutConfig> {
    let loader = ClipscoutConfigLoader::new();
    let loader = match path {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE),
    };
    loader.load().context("loading configuration")
}

pub fn log_config(cfg: &LoggingConfig) -> Result<LogConfig> {
    let format: LogFormat = cfg.format.parse().map_err(anyhow::Error::msg)?;
    Ok(LogConfig {
        app_name: "clipscout",
        log_dir: cfg.dir.as_deref().map(PathBuf::from),
        emit_stderr: cfg.stderr,
        format,
        default_filter: cfg.filter.clone(),
    })
}

pub fn search_settings(cfg: &ClipscoutConfig) -> SearchSettings {
    SearchSettings {
        api_key: cfg.upstream.api_key().map(str::to_string),
        page_size: cfg.search.page_size,
        max_pages: cfg.search.max_pages,
        page_timeout: Some(Duration::from_secs(cfg.search.page_timeout_secs)),
    }
}

pub fn search_defaults(cfg: &ClipscoutConfig) -> SearchDefaults {
    SearchDefaults {
        publish_time: PublishTime::from(cfg.search.default_publish_time.as_str()),
        sort_by: cfg.search.default_sort_by.clone(),
    }
}

pub fn build_orchestrator(cfg: &ClipscoutConfig) -> Result<Arc<SearchOrchestrator>> {
    let api = TikTokApi::new(&cfg.upstream.base_url)
        .context("building upstream client")?
        .with_region(&cfg.upstream.region)
        .with_timeout(Duration::from_secs(cfg.upstream.timeout_secs));
    let settings = search_settings(cfg);
    if settings.api_key.is_none() {
        tracing::warn!(target: "app", "app.no_api_key");
    }
    let orchestrator = SearchOrchestrator::new(Arc::new(api), settings)?;
    Ok(Arc::new(orchestrator))
}

pub fn build_state(cfg: &ClipscoutConfig) -> Result<AppState> {
    let gate = SiteGate::from_config(cfg.server.site_password(), cfg.server.secure_cookie);
    Ok(AppState::new(build_orchestrator(cfg)?)
        .with_defaults(search_defaults(cfg))
        .with_gate(gate))
}
