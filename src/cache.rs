use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::error::{AppError, Result};

/// Single-value cache with a fixed time to live. Entries are only replaced
/// once they expire; writes elsewhere do not invalidate them.
#[derive(Clone)]
pub struct TtlCache<T> {
    name: &'static str,
    inner: Cache<(), T>,
}

impl<T> TtlCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            inner: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Cached value if it is still fresh.
    pub async fn get(&self) -> Option<T> {
        self.inner.get(&()).await
    }

    pub async fn put(&self, value: T) {
        self.inner.insert((), value).await;
    }

    /// Return the fresh value or load, store and return a new one.
    /// Concurrent misses share one load; failed loads are not cached.
    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let name = self.name;
        let fut = load();
        self.inner
            .try_get_with((), async move {
                debug!("{} cache miss, loading", name);
                fut.await
            })
            .await
            .map_err(|shared: Arc<AppError>| {
                Arc::try_unwrap(shared).unwrap_or_else(|e| AppError::Internal(e.to_string()))
            })
    }
}
