//! Layered lookup of named secrets.
//!
//! A secrets file has priority; the process environment is the fallback.
//! Lookups never fail: a missing key resolves to the caller's default.

use std::{collections::HashMap, path::Path};

/// Default location of the secrets file, relative to the working directory.
pub const DEFAULT_SECRETS_PATH: &str = "config/secrets.toml";

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct CredentialResolver {
    secrets: HashMap<String, String>,
    env: EnvLookup,
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.secrets.keys().collect();
        keys.sort();
        f.debug_struct("CredentialResolver")
            .field("secret_keys", &keys)
            .finish_non_exhaustive()
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl CredentialResolver {
    /// Resolver over an in-memory secret table, falling back to the process
    /// environment.
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self {
            secrets,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Loads the secrets file at `path`. A missing or unreadable file leaves
    /// only the environment layer.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source = config::File::from(path)
            .format(config::FileFormat::Toml)
            .required(false);
        let table = config::Config::builder()
            .add_source(source)
            .build()
            .and_then(|cfg| cfg.try_deserialize::<HashMap<String, config::Value>>());

        let secrets = match table {
            Ok(table) => table
                .into_iter()
                .filter_map(|(key, value)| value.into_string().ok().map(|value| (key, value)))
                .collect(),
            Err(err) => {
                tracing::warn!("ignoring secrets file {}: {err}", path.display());
                HashMap::new()
            }
        };
        Self::new(secrets)
    }

    /// Replaces the environment layer (tests use a fixed table instead of the
    /// real process environment).
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(env);
        self
    }

    /// Value of `key`, or `default` when neither layer has it.
    pub fn resolve(&self, key: &str, default: &str) -> String {
        self.lookup(key).unwrap_or_else(|| default.to_string())
    }

    /// First key of `keys` that resolves, or the empty string.
    pub fn resolve_any(&self, keys: &[&str]) -> String {
        keys.iter()
            .find_map(|key| self.lookup(key))
            .unwrap_or_default()
    }

    /// Keys are case-sensitive: `password` and `PASSWORD` are different
    /// secrets.
    fn lookup(&self, key: &str) -> Option<String> {
        self.secrets.get(key).cloned().or_else(|| (self.env)(key))
    }
}
