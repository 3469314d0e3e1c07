//! The module contains the errors a data source can return.
//!
//! The errors are:
//!
//! - [`Configuration`] a required credential or setting is missing. Always
//!   raised before any network or database call.
//! - [`Authentication`] the identity provider rejected the credential exchange.
//! - [`Connection`] the API or the database could not be reached.
//! - [`Query`] the backend accepted the connection but the query failed.
//! - [`Protocol`] the backend answered with a shape we cannot read.
//!
//! An empty table is not an error: it is an `Ok` with zero records.
//!
//!  [`Configuration`]: SourceError::Configuration
//!  [`Authentication`]: SourceError::Authentication
//!  [`Connection`]: SourceError::Connection
//!  [`Query`]: SourceError::Query
//!  [`Protocol`]: SourceError::Protocol
use sea_orm::DbErr;
use thiserror::Error;

/// Data source errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SourceError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },
    #[error("connection error: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl SourceError {
    /// Missing-settings errors point at the deployment, not at the backend,
    /// and are never swallowed by [`FailurePolicy::DegradeToEmpty`].
    ///
    /// [`FailurePolicy::DegradeToEmpty`]: crate::FailurePolicy::DegradeToEmpty
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<DbErr> for SourceError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::Connection(err.to_string()),
            DbErr::Type(_) | DbErr::TryIntoErr { .. } => Self::Protocol(err.to_string()),
            other => Self::Query(other.to_string()),
        }
    }
}
