use std::path::PathBuf;

use agro_core::db::{AgroRepository, DbConfig, RepositoryError, RepositoryFactory};
use async_trait::async_trait;
use tracing::info;

use crate::repository::SqliteRepository;

/// Seed directory lookup, first match wins:
/// 1. `AGRO_DB_SQLITE_SEEDS_DIR`
/// 2. `./seeds` in the working directory
/// 3. `seeds` next to this crate's manifest
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AGRO_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// The `"sqlite"` backend.
///
/// ```rust,no_run
/// use agro_core::db::RepositoryRegistry;
/// use agro_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Opens `config.connection_string` (a file path, `:memory:` or a
    /// `sqlite:` URL), then applies migrations and seeds.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn AgroRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;

        let seeds = seeds_dir();
        repo.run_seeds(&seeds)
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;

        info!(db = %config.connection_string, seeds = %seeds.display(), "sqlite repository ready");
        Ok(Box::new(repo))
    }
}
