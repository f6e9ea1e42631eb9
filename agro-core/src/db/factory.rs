use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::repository::{AgroRepository, RepositoryError};

/// Storage backend selection.
///
/// | backend  | connection_string        |
/// |----------|--------------------------|
/// | `sqlite` | `agro.db`, `:memory:`    |
///
/// The connection string is interpreted only by the selected backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens repositories for one storage backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase name matched against [`DbConfig::backend`].
    fn backend_name(&self) -> &'static str;

    /// Connects and returns a repository with its schema and seed data in place.
    async fn create(&self, config: &DbConfig) -> Result<Box<dyn AgroRepository>, RepositoryError>;
}

/// Backend factories keyed by name, populated once at startup.
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Adds a factory, replacing any earlier one with the same name.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens a repository with the factory named by `config.backend`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Configuration`] for an unregistered backend,
    /// or whatever the factory itself reports.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn AgroRepository>, RepositoryError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        debug!(backend = %config.backend, "opening repository");
        factory.create(config).await
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
