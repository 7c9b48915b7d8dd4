//! Process-wide Top-N style ranking.
//!
//! The cache holds identifiers only. A refresh installs a complete new
//! snapshot in one swap, so readers observe either the previous list or the
//! new one.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use catalog_model::StyleId;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_RANKING_CAPACITY: usize = 50;
pub const DEFAULT_MAX_STALENESS: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingSnapshot {
    pub ids: Vec<StyleId>,
    pub refreshed_at: DateTime<Utc>,
}

impl RankingSnapshot {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: StyleId) -> bool {
        self.ids.contains(&id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("ranking unavailable: {0}")]
    Unavailable(String),
}

pub struct RankingCache {
    snapshot: RwLock<Option<Arc<RankingSnapshot>>>,
    capacity: usize,
    max_staleness: Duration,
}

impl Default for RankingCache {
    fn default() -> Self {
        Self::new(DEFAULT_RANKING_CAPACITY, DEFAULT_MAX_STALENESS)
    }
}

impl RankingCache {
    pub fn new(capacity: usize, max_staleness: Duration) -> Self {
        Self { snapshot: RwLock::new(None), capacity: capacity.max(1), max_staleness }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the cached list. Duplicates keep their first position and the
    /// list is cut to capacity.
    pub fn install(&self, ids: Vec<StyleId>) -> Result<Arc<RankingSnapshot>, RankingError> {
        self.install_at(ids, Utc::now())
    }

    pub fn install_at(
        &self,
        ids: Vec<StyleId>,
        refreshed_at: DateTime<Utc>,
    ) -> Result<Arc<RankingSnapshot>, RankingError> {
        let mut seen = HashSet::with_capacity(ids.len());
        let mut ranked: Vec<StyleId> = ids.into_iter().filter(|id| seen.insert(*id)).collect();
        ranked.truncate(self.capacity);

        let snapshot = Arc::new(RankingSnapshot { ids: ranked, refreshed_at });
        let mut slot = self
            .snapshot
            .write()
            .map_err(|_| RankingError::Unavailable("ranking lock poisoned".into()))?;
        *slot = Some(Arc::clone(&snapshot));
        tracing::info!(entries = snapshot.len(), refreshed_at = %snapshot.refreshed_at, "installed ranking snapshot");
        Ok(snapshot)
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.snapshot.write() {
            *slot = None;
        }
    }

    /// Current snapshot, failing when absent, empty or older than the
    /// staleness tolerance.
    pub fn snapshot(&self) -> Result<Arc<RankingSnapshot>, RankingError> {
        let current = self
            .snapshot
            .read()
            .map_err(|_| RankingError::Unavailable("ranking lock poisoned".into()))?
            .clone();
        let Some(snapshot) = current else {
            return Err(RankingError::Unavailable("ranking has not been computed".into()));
        };
        if snapshot.is_empty() {
            return Err(RankingError::Unavailable("ranking is empty".into()));
        }
        // A refresh stamped in the future counts as fresh.
        let age = (Utc::now() - snapshot.refreshed_at).to_std().unwrap_or(Duration::ZERO);
        if age > self.max_staleness {
            return Err(RankingError::Unavailable(format!(
                "ranking is stale: refreshed {}s ago, tolerance {}s",
                age.as_secs(),
                self.max_staleness.as_secs()
            )));
        }
        Ok(snapshot)
    }

    /// `min(k, N)` distinct ids from the cached list in uniformly shuffled order.
    pub fn draw_random(&self, k: usize) -> Result<Vec<StyleId>, RankingError> {
        self.draw_random_with(k, &mut rand::thread_rng())
    }

    pub fn draw_random_with<R: Rng + ?Sized>(
        &self,
        k: usize,
        rng: &mut R,
    ) -> Result<Vec<StyleId>, RankingError> {
        let snapshot = self.snapshot()?;
        let mut ids = snapshot.ids.clone();
        ids.shuffle(rng);
        ids.truncate(k);
        Ok(ids)
    }
}
