use std::path::{Path, PathBuf};
use std::time::Duration;

use catalog_model::BackendKind;
use catalog_store::pool::PoolOptions;
use serde::{Deserialize, Serialize};
use text_generation::config::{default_template_config, GeneratorConfig};
use text_generation::generator::duration_millis;

use crate::error::ServiceError;

/// Default catalog service settings.
#[derive(Debug, Clone, Copy)]
pub struct CatalogDefaults {
    pub search_page_size: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub style_draw_size: usize,
    pub ranking_capacity: usize,
    pub ranking_max_staleness_secs: u64,
    pub refresh_interval_secs: u64,
    pub sample_cap: usize,
    pub pool_size: usize,
    pub acquire_timeout_ms: u64,
    pub db_path: &'static str,
    pub documents_path: &'static str,
}

/// Shared defaults so CLI, service and tests stay in sync.
pub const CATALOG_DEFAULTS: CatalogDefaults = CatalogDefaults {
    search_page_size: 20,
    default_page_size: 20,
    max_page_size: 100,
    style_draw_size: 8,
    ranking_capacity: 50,
    ranking_max_staleness_secs: 24 * 60 * 60,
    refresh_interval_secs: 60 * 60,
    sample_cap: 100,
    pool_size: 4,
    acquire_timeout_ms: 5_000,
    db_path: "target/demo/catalog.db",
    documents_path: "target/demo/products.jsonl",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Backend holding catalog items.
    pub catalog_backend: BackendKind,
    /// SQLite file; `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    /// JSON-lines file for the document backend; `None` keeps it in memory.
    pub documents_path: Option<PathBuf>,
    pub search_page_size: usize,
    pub default_page_size: usize,
    /// Larger requested page sizes are clamped to this.
    pub max_page_size: usize,
    pub style_draw_size: usize,
    pub ranking_capacity: usize,
    #[serde(with = "duration_millis")]
    pub ranking_max_staleness: Duration,
    #[serde(with = "duration_millis")]
    pub refresh_interval: Duration,
    /// Hard cap on candidates fetched by thumbnail sampling.
    pub sample_cap: usize,
    pub pool_size: usize,
    #[serde(with = "duration_millis")]
    pub acquire_timeout: Duration,
    pub generator: GeneratorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            catalog_backend: BackendKind::Document,
            db_path: Some(PathBuf::from(CATALOG_DEFAULTS.db_path)),
            documents_path: Some(PathBuf::from(CATALOG_DEFAULTS.documents_path)),
            search_page_size: CATALOG_DEFAULTS.search_page_size,
            default_page_size: CATALOG_DEFAULTS.default_page_size,
            max_page_size: CATALOG_DEFAULTS.max_page_size,
            style_draw_size: CATALOG_DEFAULTS.style_draw_size,
            ranking_capacity: CATALOG_DEFAULTS.ranking_capacity,
            ranking_max_staleness: Duration::from_secs(CATALOG_DEFAULTS.ranking_max_staleness_secs),
            refresh_interval: Duration::from_secs(CATALOG_DEFAULTS.refresh_interval_secs),
            sample_cap: CATALOG_DEFAULTS.sample_cap,
            pool_size: CATALOG_DEFAULTS.pool_size,
            acquire_timeout: Duration::from_millis(CATALOG_DEFAULTS.acquire_timeout_ms),
            generator: default_template_config(),
        }
    }
}

impl ServiceConfig {
    /// Defaults with both stores held in memory.
    pub fn in_memory(catalog_backend: BackendKind) -> Self {
        Self { catalog_backend, db_path: None, documents_path: None, ..Self::default() }
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions { size: self.pool_size, acquire_timeout: self.acquire_timeout }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Config(format!("read {}: {e}", path.display())))?;
        let cfg: Self = serde_json::from_str(&raw)
            .map_err(|e| ServiceError::Config(format!("parse {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ServiceError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| ServiceError::Config(e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))?;
        std::fs::write(path, raw).map_err(|e| ServiceError::Config(format!("write {}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        let positive = [
            ("search_page_size", self.search_page_size),
            ("default_page_size", self.default_page_size),
            ("max_page_size", self.max_page_size),
            ("style_draw_size", self.style_draw_size),
            ("ranking_capacity", self.ranking_capacity),
            ("sample_cap", self.sample_cap),
            ("pool_size", self.pool_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ServiceError::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.search_page_size > self.max_page_size || self.default_page_size > self.max_page_size {
            return Err(ServiceError::Config("page sizes must not exceed max_page_size".into()));
        }
        Ok(())
    }
}
