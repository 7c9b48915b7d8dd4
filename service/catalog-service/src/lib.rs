use std::sync::Arc;

use catalog_model::{
    BackendKind, CatalogItem, CategoryFilter, ItemDraft, ItemKey, ItemView, KeywordQuery, Slice,
};
use catalog_store::cursor;
use catalog_store::document_store::DocumentStore;
use catalog_store::sqlite_repo::SqliteRepo;
use catalog_store::{
    execute_slice, CatalogSliceStore, CatalogWriteStore, FilterOp, KeywordMatcher, RankingCache,
    SliceQuery,
};
use text_generation::config::build_generator;
use text_generation::generator::TextGenerator;

pub mod config;
pub mod error;
pub mod refresher;
mod scripts;
mod styles;

pub use config::{ServiceConfig, CATALOG_DEFAULTS};
pub use error::ServiceError;
pub use refresher::RankingRefresher;

/// Catalog query and recommendation facade. Callers never address a backend
/// directly; the configured catalog backend serves every item read.
pub struct CatalogService {
    cfg: ServiceConfig,
    catalog: Arc<dyn CatalogWriteStore>,
    documents: Option<DocumentStore>,
    repo: Arc<SqliteRepo>,
    ranking: Arc<RankingCache>,
    generator: Arc<dyn TextGenerator>,
}

impl CatalogService {
    pub fn new(cfg: ServiceConfig) -> Result<Self, ServiceError> {
        cfg.validate()?;
        let repo = match &cfg.db_path {
            Some(path) => {
                if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    std::fs::create_dir_all(dir).map_err(|e| ServiceError::Config(e.to_string()))?;
                }
                SqliteRepo::open(path, cfg.pool_options())?
            }
            None => SqliteRepo::open_in_memory(cfg.pool_options())?,
        };
        let repo = Arc::new(repo);
        let generator = build_generator(&cfg.generator)?;

        let (catalog, documents): (Arc<dyn CatalogWriteStore>, Option<DocumentStore>) = match cfg.catalog_backend {
            BackendKind::Relational => {
                let relational: Arc<dyn CatalogWriteStore> = repo.clone();
                (relational, None)
            }
            BackendKind::Document => {
                let docs = match &cfg.documents_path {
                    Some(path) => DocumentStore::open(path)?,
                    None => DocumentStore::new(),
                };
                let document: Arc<dyn CatalogWriteStore> = Arc::new(docs.clone());
                (document, Some(docs))
            }
        };
        tracing::info!(
            backend = %cfg.catalog_backend,
            relational = repo.location(),
            "catalog service ready"
        );
        Ok(Self::assemble(cfg, catalog, documents, repo, generator))
    }

    /// Build from already opened parts; the catalog may be any backend.
    pub fn with_parts(
        cfg: ServiceConfig,
        catalog: Arc<dyn CatalogWriteStore>,
        repo: Arc<SqliteRepo>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self::assemble(cfg, catalog, None, repo, generator)
    }

    fn assemble(
        cfg: ServiceConfig,
        catalog: Arc<dyn CatalogWriteStore>,
        documents: Option<DocumentStore>,
        repo: Arc<SqliteRepo>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let ranking = Arc::new(RankingCache::new(cfg.ranking_capacity, cfg.ranking_max_staleness));
        Self { cfg, catalog, documents, repo, ranking, generator }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.cfg
    }

    pub fn backend(&self) -> BackendKind {
        self.catalog.kind()
    }

    pub fn repo(&self) -> &Arc<SqliteRepo> {
        &self.repo
    }

    pub fn ranking(&self) -> &Arc<RankingCache> {
        &self.ranking
    }

    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    // ------------------------------
    // Catalog listing
    // ------------------------------

    pub fn list_by_category(
        &self,
        cursor: Option<&str>,
        filter: &CategoryFilter,
        page_size: usize,
    ) -> Result<Slice<ItemView>, ServiceError> {
        let size = self.resolve_page_size(page_size)?;
        let query = SliceQuery::new(self.resolve_cursor(cursor)?).with_category(filter);
        let slice = execute_slice(self.catalog.as_ref(), &query, size)?;
        Ok(slice.map(|item| ItemView::from(&item)))
    }

    /// Case-insensitive name search with the configured fixed page size.
    pub fn search_by_name(&self, term: &str, cursor: Option<&str>) -> Result<Slice<ItemView>, ServiceError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ServiceError::InvalidRequest("search term must not be blank".into()));
        }
        let query = SliceQuery::new(self.resolve_cursor(cursor)?)
            .with_filter(FilterOp::NameContains(term.to_string()));
        let slice = execute_slice(self.catalog.as_ref(), &query, self.cfg.search_page_size)?;
        Ok(slice.map(|item| ItemView::from(&item)))
    }

    pub fn recommend_by_keywords(
        &self,
        keywords: &KeywordQuery,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Slice<ItemView>, ServiceError> {
        let size = self.resolve_page_size(page_size)?;
        let before = self.resolve_cursor(cursor)?;
        let slice = self.matcher().matching(keywords, before, size)?;
        Ok(slice.map(|item| ItemView::from(&item)))
    }

    /// Active item by its encoded id. Undecodable, absent and soft-deleted ids
    /// are all `NotFound`.
    pub fn detail(&self, id: &str) -> Result<CatalogItem, ServiceError> {
        let key = cursor::decode(self.catalog.kind(), id)
            .map_err(|_| ServiceError::NotFound(format!("product {id}")))?;
        self.detail_by_key(&key)
    }

    pub fn detail_by_key(&self, key: &ItemKey) -> Result<CatalogItem, ServiceError> {
        self.catalog
            .get_active(key)?
            .ok_or_else(|| ServiceError::NotFound(format!("product {key}")))
    }

    // ------------------------------
    // Catalog ingestion and lifecycle
    // ------------------------------

    pub fn insert_items(&self, drafts: Vec<ItemDraft>) -> Result<Vec<ItemKey>, ServiceError> {
        Ok(self.catalog.insert_items(drafts)?)
    }

    pub fn soft_delete_items(&self, keys: &[ItemKey]) -> Result<usize, ServiceError> {
        let n = self.catalog.soft_delete_items(keys)?;
        tracing::info!(requested = keys.len(), deleted = n, "soft-deleted catalog items");
        Ok(n)
    }

    /// Write the document backend to its configured file. No-op otherwise.
    pub fn persist(&self) -> Result<(), ServiceError> {
        if let (Some(docs), Some(path)) = (&self.documents, &self.cfg.documents_path) {
            docs.save_to(path)?;
            tracing::info!(path = %path.display(), "saved document store");
        }
        Ok(())
    }

    // ------------------------------
    // Shared helpers
    // ------------------------------

    fn matcher(&self) -> KeywordMatcher<'_, dyn CatalogWriteStore> {
        KeywordMatcher::new(self.catalog.as_ref()).with_sample_cap(self.cfg.sample_cap)
    }

    fn resolve_page_size(&self, requested: usize) -> Result<usize, ServiceError> {
        if requested == 0 {
            return Err(ServiceError::InvalidRequest("page size must be greater than zero".into()));
        }
        Ok(requested.min(self.cfg.max_page_size))
    }

    /// Decode a caller cursor, falling back to the newest-first sentinel when
    /// it is absent or malformed.
    fn resolve_cursor(&self, raw: Option<&str>) -> Result<Option<ItemKey>, ServiceError> {
        let kind = self.catalog.kind();
        if let Some(raw) = raw {
            match cursor::decode(kind, raw) {
                Ok(key) => return Ok(Some(key)),
                Err(e) => tracing::debug!(error = %e, "ignoring cursor, starting from newest"),
            }
        }
        Ok(cursor::sentinel_after(self.catalog.max_key()?))
    }

    fn item_views(&self, keys: &[ItemKey]) -> Result<Vec<ItemView>, ServiceError> {
        let items = self.catalog.get_active_many(keys)?;
        if items.len() < keys.len() {
            tracing::debug!(requested = keys.len(), resolved = items.len(), "skipped unresolvable products");
        }
        Ok(items.iter().map(ItemView::from).collect())
    }
}
