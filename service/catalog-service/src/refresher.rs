//! Background ranking batch: recompute the top-N styles by hearts on a fixed
//! interval and swap them into the shared cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use catalog_store::sqlite_repo::SqliteRepo;
use catalog_store::{RankingCache, RankingSnapshot};

use crate::{CatalogService, ServiceError};

/// Recompute the top-N styles by hearts and install them.
pub fn refresh_once(repo: &SqliteRepo, ranking: &RankingCache) -> Result<Arc<RankingSnapshot>, ServiceError> {
    let entries = repo.top_styles_by_hearts(ranking.capacity())?;
    Ok(ranking.install(entries.into_iter().map(|e| e.style_id).collect())?)
}

/// Handle to the refresh thread. Dropping it stops the thread.
pub struct RankingRefresher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RankingRefresher {
    /// Refresh immediately, then every `interval` until stopped.
    pub fn spawn(repo: Arc<SqliteRepo>, ranking: Arc<RankingCache>, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::SeqCst) {
                match refresh_once(&repo, &ranking) {
                    Ok(snapshot) => tracing::debug!(entries = snapshot.len(), "ranking refreshed"),
                    // Keep serving the previous snapshot.
                    Err(e) => tracing::warn!(error = %e, "ranking refresh failed"),
                }
                std::thread::park_timeout(interval);
            }
        });
        Self { stop, handle: Some(handle) }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for RankingRefresher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl CatalogService {
    pub fn start_refresher(&self) -> RankingRefresher {
        RankingRefresher::spawn(Arc::clone(&self.repo), Arc::clone(&self.ranking), self.cfg.refresh_interval)
    }
}
