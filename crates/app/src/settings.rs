//! Settings of the `opex` binary.
//!
//! Read from `config/opex.toml` (optional) and `OPEX_*` environment
//! variables, e.g. `OPEX_SOURCE__BACKEND=sql`. Secrets never live here; they
//! come from the secrets file named by `secrets_path` or the environment.

use std::time::Duration;

use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use engine::{
    Backend, FailurePolicy, SqlDialect, credentials::DEFAULT_SECRETS_PATH,
    sources::{power_bi, sql},
};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/opex.toml";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub ttl_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            ttl_secs: engine::cache::DEFAULT_TTL.as_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Source {
    pub backend: Backend,
    /// Overrides the backend's own policy when set.
    pub failure_policy: Option<FailurePolicy>,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            backend: Backend::PowerBi,
            failure_policy: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PowerBi {
    pub token_url: String,
    pub scope: String,
    pub api_base: String,
    pub query: String,
}

impl Default for PowerBi {
    fn default() -> Self {
        Self {
            token_url: power_bi::TOKEN_URL.to_string(),
            scope: power_bi::POWER_BI_SCOPE.to_string(),
            api_base: power_bi::API_BASE.to_string(),
            query: power_bi::EXPENSES_DAX.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sql {
    pub dialect: SqlDialect,
    pub cutoff: NaiveDate,
    pub connect_timeout_secs: u64,
}

impl Default for Sql {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::default(),
            cutoff: sql::default_cutoff(),
            connect_timeout_secs: 30,
        }
    }
}

impl Sql {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub cache: Cache,
    pub source: Source,
    pub power_bi: PowerBi,
    pub sql: Sql,
    pub secrets_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: App::default(),
            cache: Cache::default(),
            source: Source::default(),
            power_bi: PowerBi::default(),
            sql: Sql::default(),
            secrets_path: DEFAULT_SECRETS_PATH.to_string(),
        }
    }
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("OPEX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}
