//! Data sources: the two interchangeable ways of fetching the expenses table.

use serde::{Deserialize, Serialize};

use crate::{Backend, ExpenseTable, SourceError};

pub mod power_bi;
pub mod sql;

pub use power_bi::{PowerBiClient, PowerBiSource};
pub use sql::{SeaOrmConnector, SqlConnection, SqlConnector, SqlDialect, SqlSource};

/// What a source does when its backend fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return the error to the caller.
    FailFast,
    /// Log the error and return an empty, degraded table. Configuration
    /// errors still propagate.
    DegradeToEmpty,
}

impl FailurePolicy {
    /// Policy the dashboard has always used for `backend`.
    pub const fn default_for(backend: Backend) -> Self {
        match backend {
            Backend::PowerBi => FailurePolicy::FailFast,
            Backend::Sql => FailurePolicy::DegradeToEmpty,
        }
    }

    pub(crate) fn apply(
        self,
        backend: Backend,
        result: Result<ExpenseTable, SourceError>,
    ) -> Result<ExpenseTable, SourceError> {
        match (self, result) {
            (_, Ok(table)) => Ok(table),
            (FailurePolicy::DegradeToEmpty, Err(err)) if !err.is_configuration() => {
                tracing::error!(%backend, "fetch failed, returning an empty table: {err}");
                Ok(ExpenseTable::degraded(backend))
            }
            (_, Err(err)) => {
                tracing::error!(%backend, "fetch failed: {err}");
                Err(err)
            }
        }
    }
}

/// The configured backend.
#[derive(Debug)]
pub enum ExpenseSource {
    PowerBi(PowerBiSource),
    Sql(SqlSource<SeaOrmConnector>),
}

impl ExpenseSource {
    pub fn backend(&self) -> Backend {
        match self {
            ExpenseSource::PowerBi(_) => Backend::PowerBi,
            ExpenseSource::Sql(_) => Backend::Sql,
        }
    }

    /// Fetches and normalizes the whole expenses table.
    pub async fn fetch_expenses(&self) -> Result<ExpenseTable, SourceError> {
        match self {
            ExpenseSource::PowerBi(source) => source.fetch_expenses().await,
            ExpenseSource::Sql(source) => source.fetch_expenses().await,
        }
    }
}

impl From<PowerBiSource> for ExpenseSource {
    fn from(source: PowerBiSource) -> Self {
        ExpenseSource::PowerBi(source)
    }
}

impl From<SqlSource<SeaOrmConnector>> for ExpenseSource {
    fn from(source: SqlSource<SeaOrmConnector>) -> Self {
        ExpenseSource::Sql(source)
    }
}
