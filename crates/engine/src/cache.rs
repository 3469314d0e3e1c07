//! Time-boxed memoization of a whole fetch.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{sync::Mutex, time::Instant};

/// Default lifetime of a cached table.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Decides whether a freshly fetched value may be stored.
pub trait Cacheable {
    fn is_cacheable(&self) -> bool {
        true
    }
}

impl Cacheable for crate::ExpenseTable {
    /// A table produced by swallowing a backend failure is served once but
    /// never stored, so the next read retries the backend.
    fn is_cacheable(&self) -> bool {
        !self.degraded
    }
}

#[derive(Debug)]
struct Entry<T> {
    key: String,
    value: Arc<T>,
    stored_at: Instant,
}

/// A single-slot cache. The whole value is the unit of caching; the key only
/// tells apart values produced by different sources.
///
/// The lock is held while a miss is being fetched, so concurrent readers wait
/// for the one fetch in flight and never see a partially built value.
#[derive(Debug)]
pub struct TableCache<T> {
    slot: Mutex<Option<Entry<T>>>,
}

impl<T> Default for TableCache<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T: Cacheable> TableCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key` if it is younger than `ttl`,
    /// otherwise runs `fetch`. Errors are returned and never cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, ttl: Duration, fetch: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.as_ref()
            && entry.key == key
            && entry.stored_at.elapsed() < ttl
        {
            tracing::debug!(key, "cache hit");
            return Ok(Arc::clone(&entry.value));
        }

        tracing::debug!(key, "cache miss");
        let value = Arc::new(fetch().await?);
        if value.is_cacheable() {
            *slot = Some(Entry {
                key: key.to_string(),
                value: Arc::clone(&value),
                stored_at: Instant::now(),
            });
        } else {
            *slot = None;
        }
        Ok(value)
    }

    /// Drops the cached value; the next read fetches.
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }

    pub async fn is_populated(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}
