use catalog_model::{CatalogItem, ItemKey, KeywordQuery, Slice};
use rand::Rng;

use crate::slice_executor::execute_slice;
use crate::{CatalogSliceStore, SliceQuery, StoreError};

pub const DEFAULT_SAMPLE_CAP: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum KeywordError {
    /// No active item carries any of the keywords.
    #[error("no catalog item matches keywords {0:?}")]
    NoMatchFound(Vec<String>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Keyword-set matching over one catalog backend.
pub struct KeywordMatcher<'a, S: CatalogSliceStore + ?Sized> {
    store: &'a S,
    sample_cap: usize,
}

impl<'a, S: CatalogSliceStore + ?Sized> KeywordMatcher<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store, sample_cap: DEFAULT_SAMPLE_CAP }
    }

    pub fn with_sample_cap(mut self, cap: usize) -> Self {
        self.sample_cap = cap.max(1);
        self
    }

    pub fn sample_cap(&self) -> usize {
        self.sample_cap
    }

    /// Newest-first keyset slice of active items whose keyword set intersects
    /// `keywords`. An empty keyword set matches nothing.
    pub fn matching(
        &self,
        keywords: &KeywordQuery,
        before: Option<ItemKey>,
        size: usize,
    ) -> Result<Slice<CatalogItem>, StoreError> {
        if keywords.is_empty() {
            return Ok(Slice::empty());
        }
        let query = SliceQuery::new(before).with_keywords(keywords);
        execute_slice(self.store, &query, size)
    }

    /// Pick one matching item uniformly at random from the newest
    /// `sample_cap` matches.
    pub fn sample_one(&self, keywords: &KeywordQuery) -> Result<CatalogItem, KeywordError> {
        self.sample_one_with(keywords, &mut rand::thread_rng())
    }

    pub fn sample_one_with<R: Rng + ?Sized>(
        &self,
        keywords: &KeywordQuery,
        rng: &mut R,
    ) -> Result<CatalogItem, KeywordError> {
        if keywords.is_empty() {
            return Err(KeywordError::NoMatchFound(Vec::new()));
        }
        let query = SliceQuery::new(None).with_keywords(keywords);
        let mut candidates = self.store.fetch_slice(&query, self.sample_cap)?;
        if candidates.is_empty() {
            return Err(KeywordError::NoMatchFound(keywords.to_vec()));
        }
        let pick = rng.gen_range(0..candidates.len());
        Ok(candidates.swap_remove(pick))
    }
}
