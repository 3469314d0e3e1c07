//! Acquisition and normalization of the operating-expenses table.
//!
//! Two interchangeable sources produce the same table:
//!
//! - [`PowerBiSource`]: OAuth password grant, then one DAX query against the
//!   semantic model over the Power BI REST API.
//! - [`SqlSource`]: one fixed join/pivot query straight against the
//!   accounting database.
//!
//! Both end in [`normalize`], so the report layer only ever sees
//! [`ExpenseRecord`]s. [`Dashboard`] wraps the configured source in a
//! time-boxed [`TableCache`]; [`filter`], [`report`] and [`export`] work on
//! the cached table.

pub use cache::{Cacheable, TableCache};
pub use credentials::CredentialResolver;
pub use dashboard::{Dashboard, DashboardBuilder};
pub use error::SourceError;
pub use filter::ExpenseFilter;
pub use flatten::{clean_column_name, flatten};
pub use normalize::normalize;
pub use record::{
    ADMINISTRATION_DEPARTMENT, Backend, DistributionBase, ExpenseRecord, ExpenseTable,
    OTHER_DEPARTMENT, RawRecord, UNSPECIFIED,
};
pub use sources::{
    ExpenseSource, FailurePolicy, PowerBiClient, PowerBiSource, SeaOrmConnector, SqlConnection,
    SqlConnector, SqlDialect, SqlSource,
    power_bi::{AccessToken, PowerBiCredentials},
    sql::{ExpensesQuery, SqlSettings},
};

pub mod cache;
pub mod credentials;
mod dashboard;
mod error;
pub mod export;
pub mod filter;
mod flatten;
pub mod normalize;
mod record;
pub mod report;
pub mod sources;
