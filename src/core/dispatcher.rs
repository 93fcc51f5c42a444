use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::models::{OutcomeStatus, RegionDescriptor, RegionOutcome, SearchRequest};
use crate::services::{CacheKey, OutcomeCache, RegionBackend};

/// A region call that has been started but not yet collected
///
/// Dropping the call aborts its task, so a cancelled search leaves no
/// backend call or cache write running behind it.
pub struct PendingCall {
    pub region: RegionDescriptor,
    pub handle: JoinHandle<RegionOutcome>,
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        // No-op once the task has finished
        self.handle.abort();
    }
}

/// Starts one independent search task per selected region
#[derive(Clone)]
pub struct RegionDispatcher {
    backend: Arc<dyn RegionBackend>,
    cache: Option<Arc<dyn OutcomeCache>>,
    cache_ttl: Duration,
}

impl RegionDispatcher {
    pub fn new(backend: Arc<dyn RegionBackend>, cache: Option<Arc<dyn OutcomeCache>>, cache_ttl: Duration) -> Self {
        Self {
            backend,
            cache,
            cache_ttl,
        }
    }

    /// Spawn all region calls at once; returned in dispatch order
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, request: Arc<SearchRequest>, regions: Vec<RegionDescriptor>) -> Vec<PendingCall> {
        let fingerprint = CacheKey::request_fingerprint(&request);

        regions
            .into_iter()
            .map(|region| {
                let this = self.clone();
                let request = Arc::clone(&request);
                let task_region = region.clone();
                let handle = tokio::spawn(async move {
                    this.search_region(&request, &task_region, fingerprint).await
                });
                PendingCall { region, handle }
            })
            .collect()
    }

    /// Run one region's search; failures are folded into the outcome
    async fn search_region(&self, request: &SearchRequest, region: &RegionDescriptor, fingerprint: u64) -> RegionOutcome {
        let started = Instant::now();
        let cache_key = CacheKey::region_outcome(fingerprint, &region.id);

        if let Some(cache) = &self.cache {
            if let Some(mut cached) = cache.get(&cache_key).await {
                tracing::debug!("Region {} served from cache", region.id);
                cached.status = OutcomeStatus::Success;
                cached.cache_hit = true;
                cached.elapsed_ms = started.elapsed().as_millis() as u64;
                return cached;
            }
        }

        let query = request.scoped_to(&region.id);
        match self.backend.search(&query).await {
            Ok(mut items) => {
                for item in &mut items {
                    item.source_region = Some(region.id.clone());
                }
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::debug!("Region {} returned {} items in {}ms", region.id, items.len(), elapsed_ms);

                let outcome = RegionOutcome::success(region, items, elapsed_ms);
                if let Some(cache) = &self.cache {
                    cache.put(&cache_key, &outcome, self.cache_ttl).await;
                }
                outcome
            }
            Err(e) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::warn!("Region {} search failed after {}ms: {}", region.id, elapsed_ms, e);
                RegionOutcome::failure(region, e.to_string(), elapsed_ms)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RegionQuery, ResultItem};
    use crate::services::{BackendError, CacheManager};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        calls: AtomicUsize,
        fail_region: Option<&'static str>,
    }

    #[async_trait]
    impl RegionBackend for CountingBackend {
        async fn search(&self, query: &RegionQuery) -> Result<Vec<ResultItem>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_region == Some(query.region_id.as_str()) {
                return Err(BackendError::Api("index offline".into()));
            }
            Ok(vec![ResultItem {
                id: format!("{}-1", query.region_id),
                name: "Hotel".to_string(),
                relevance_score: 0.8,
                latitude: None,
                longitude: None,
                updated_at: None,
                source_region: None,
            }])
        }
    }

    fn region(id: &str) -> RegionDescriptor {
        RegionDescriptor {
            id: id.to_string(),
            name: id.to_uppercase(),
            healthy: true,
            priority: 0.0,
        }
    }

    fn request() -> Arc<SearchRequest> {
        Arc::new(SearchRequest {
            destination: Some("Hanoi".to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_dispatch_preserves_order_and_stamps_source() {
        let backend = Arc::new(CountingBackend { calls: AtomicUsize::new(0), fail_region: None });
        let dispatcher = RegionDispatcher::new(backend, None, Duration::from_secs(60));

        let pending = dispatcher.dispatch(request(), vec![region("a"), region("b")]);
        assert_eq!(pending[0].region.id, "a");
        assert_eq!(pending[1].region.id, "b");

        let mut outcomes = Vec::new();
        for mut call in pending {
            outcomes.push((&mut call.handle).await.unwrap());
        }
        assert_eq!(outcomes[1].items[0].source_region.as_deref(), Some("b"));
        assert!(!outcomes[0].cache_hit);
    }

    #[tokio::test]
    async fn test_backend_failure_is_contained() {
        let backend = Arc::new(CountingBackend { calls: AtomicUsize::new(0), fail_region: Some("b") });
        let dispatcher = RegionDispatcher::new(backend, None, Duration::from_secs(60));

        let pending = dispatcher.dispatch(request(), vec![region("a"), region("b")]);
        let mut outcomes = Vec::new();
        for mut call in pending {
            outcomes.push((&mut call.handle).await.unwrap());
        }

        assert_eq!(outcomes[0].status, OutcomeStatus::Success);
        assert_eq!(outcomes[1].status, OutcomeStatus::Failure);
        assert_eq!(outcomes[1].item_count, 0);
        assert!(outcomes[1].error.as_deref().unwrap().contains("index offline"));
    }

    #[tokio::test]
    async fn test_second_dispatch_hits_cache() {
        let backend = Arc::new(CountingBackend { calls: AtomicUsize::new(0), fail_region: None });
        let cache: Arc<dyn OutcomeCache> = Arc::new(CacheManager::in_memory(100, 60));
        let dispatcher = RegionDispatcher::new(backend.clone(), Some(cache), Duration::from_secs(60));

        let first = dispatcher.dispatch(request(), vec![region("a")]);
        for mut call in first {
            (&mut call.handle).await.unwrap();
        }

        let second = dispatcher.dispatch(request(), vec![region("a")]);
        let mut outcomes = Vec::new();
        for mut call in second {
            outcomes.push((&mut call.handle).await.unwrap());
        }

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(outcomes[0].cache_hit);
        assert_eq!(outcomes[0].item_count, 1);
    }

    struct SlowBackend {
        completed: AtomicUsize,
    }

    #[async_trait]
    impl RegionBackend for SlowBackend {
        async fn search(&self, _query: &RegionQuery) -> Result<Vec<ResultItem>, BackendError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_pending_calls_aborts_region_tasks() {
        let backend = Arc::new(SlowBackend { completed: AtomicUsize::new(0) });
        let cache = Arc::new(CacheManager::in_memory(100, 60));
        let shared: Arc<dyn OutcomeCache> = cache.clone();
        let dispatcher = RegionDispatcher::new(backend.clone(), Some(shared), Duration::from_secs(60));

        let pending = dispatcher.dispatch(request(), vec![region("a"), region("b")]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(pending);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(backend.completed.load(Ordering::SeqCst), 0);
        let key = CacheKey::region_outcome(CacheKey::request_fingerprint(&request()), "a");
        assert!(OutcomeCache::get(cache.as_ref(), &key).await.is_none());
    }
}
