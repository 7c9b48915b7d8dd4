pub mod cursor;
pub mod document_store;
pub mod keyword_matcher;
pub mod pool;
pub mod ranking_cache;
pub mod slice_executor;
pub mod sqlite_repo;

use catalog_model::{BackendKind, CatalogItem, CategoryFilter, ItemDraft, ItemKey, KeywordQuery};

pub use cursor::CursorError;
pub use keyword_matcher::{KeywordError, KeywordMatcher};
pub use ranking_cache::{RankingCache, RankingError, RankingSnapshot};
pub use slice_executor::{execute_slice, lookahead_position};

// ------------------------------
// Filters and slice queries
// ------------------------------

/// One filter predicate. Every supplied op is ANDed with the key bound and
/// the lifecycle predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    MainCategoryEq(String),
    SubCategoryEq(String),
    /// Item keyword set intersects these keywords. An empty list matches nothing.
    KeywordsAny(Vec<String>),
    /// Case-insensitive substring match on the item name.
    NameContains(String),
}

/// Bounded, filtered, newest-first read against one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceQuery {
    /// Only keys strictly less than this are eligible. `None` reads from the top.
    pub before: Option<ItemKey>,
    pub filters: Vec<FilterOp>,
}

impl SliceQuery {
    pub fn new(before: Option<ItemKey>) -> Self {
        Self { before, filters: Vec::new() }
    }

    pub fn with_filter(mut self, op: FilterOp) -> Self {
        self.filters.push(op);
        self
    }

    pub fn with_category(mut self, filter: &CategoryFilter) -> Self {
        if let Some(main) = &filter.main {
            self.filters.push(FilterOp::MainCategoryEq(main.clone()));
        }
        if let Some(sub) = &filter.sub {
            self.filters.push(FilterOp::SubCategoryEq(sub.clone()));
        }
        self
    }

    pub fn with_keywords(self, keywords: &KeywordQuery) -> Self {
        self.with_filter(FilterOp::KeywordsAny(keywords.to_vec()))
    }

    /// Same filters, continuing after `key`.
    pub fn continue_after(&self, key: ItemKey) -> Self {
        Self { before: Some(key), filters: self.filters.clone() }
    }
}

/// Read side of a catalog backend: the single "bounded ordered filtered read"
/// seam both storage engines implement.
///
/// Every method excludes soft-deleted items. `exists_beyond` is evaluated in
/// a separate statement from `fetch_slice`, so under concurrent writes the
/// pair is best-effort rather than a snapshot.
pub trait CatalogSliceStore: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Up to `limit` active items matching `query`, descending by key.
    fn fetch_slice(&self, query: &SliceQuery, limit: usize) -> Result<Vec<CatalogItem>, StoreError>;

    /// True when a matching active item exists at zero-based `position` or later
    /// in descending key order.
    fn exists_beyond(&self, query: &SliceQuery, position: usize) -> Result<bool, StoreError>;

    /// Active item by key; `None` when absent, soft-deleted or of the other kind.
    fn get_active(&self, key: &ItemKey) -> Result<Option<CatalogItem>, StoreError>;

    /// Active items for `keys`, preserving the requested order and skipping misses.
    fn get_active_many(&self, keys: &[ItemKey]) -> Result<Vec<CatalogItem>, StoreError> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(item) = self.get_active(key)? {
                out.push(item);
            }
        }
        Ok(out)
    }

    /// Greatest key ever assigned, including soft-deleted rows.
    fn max_key(&self) -> Result<Option<ItemKey>, StoreError>;
}

/// Write side used by ingestion and logical deletion.
pub trait CatalogWriteStore: CatalogSliceStore {
    /// Insert new items; the backend assigns monotonically increasing keys.
    fn insert_items(&self, drafts: Vec<ItemDraft>) -> Result<Vec<ItemKey>, StoreError>;

    /// Mark items inactive. Returns the number of items that were active.
    fn soft_delete_items(&self, keys: &[ItemKey]) -> Result<usize, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend could not be reached (pool exhausted, database locked, lock poisoned).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    ErrorCode::CannotOpen
                        | ErrorCode::DatabaseBusy
                        | ErrorCode::DatabaseLocked
                        | ErrorCode::SystemIoFailure
                ) =>
            {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err.to_string())
    }
}
