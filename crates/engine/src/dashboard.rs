//! The cached entry point of the report layer.

use std::{sync::Arc, time::Duration};

use crate::{ExpenseSource, ExpenseTable, SourceError, TableCache, cache::DEFAULT_TTL};

/// Composes the configured source with the table cache. This is what the
/// report layer holds on to.
#[derive(Debug)]
pub struct Dashboard {
    source: ExpenseSource,
    cache: TableCache<ExpenseTable>,
    ttl: Duration,
}

impl Dashboard {
    /// Return a builder for `Dashboard`.
    pub fn builder() -> DashboardBuilder {
        DashboardBuilder::default()
    }

    pub fn source(&self) -> &ExpenseSource {
        &self.source
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The expenses table, fetched at most once per TTL window.
    pub async fn expenses(&self) -> Result<Arc<ExpenseTable>, SourceError> {
        let backend = self.source.backend();
        self.cache
            .get_or_fetch(backend.as_str(), self.ttl, || self.source.fetch_expenses())
            .await
    }

    /// Drops the cached table and fetches a fresh one.
    pub async fn refresh(&self) -> Result<Arc<ExpenseTable>, SourceError> {
        tracing::info!("refreshing expenses table");
        self.cache.invalidate().await;
        self.expenses().await
    }
}

#[derive(Debug, Default)]
pub struct DashboardBuilder {
    source: Option<ExpenseSource>,
    ttl: Option<Duration>,
}

impl DashboardBuilder {
    /// Pass the required source
    pub fn source(mut self, source: impl Into<ExpenseSource>) -> DashboardBuilder {
        self.source = Some(source.into());
        self
    }

    /// Cache lifetime, 30 minutes when not set.
    pub fn ttl(mut self, ttl: Duration) -> DashboardBuilder {
        self.ttl = Some(ttl);
        self
    }

    /// Construct `Dashboard`
    pub fn build(self) -> Result<Dashboard, SourceError> {
        let source = self.source.ok_or_else(|| {
            SourceError::Configuration("no expenses source configured".to_string())
        })?;
        Ok(Dashboard {
            source,
            cache: TableCache::new(),
            ttl: self.ttl.unwrap_or(DEFAULT_TTL),
        })
    }
}
