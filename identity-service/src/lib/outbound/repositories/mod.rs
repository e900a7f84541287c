use std::sync::Arc;

use crate::config::Config;
use crate::domain::identity::ports::IdentityRepository;
use crate::identity::errors::StorageError;

pub mod file;
pub mod postgres;

pub use file::FileIdentityRepository;
pub use postgres::PostgresIdentityRepository;

/// Open the storage realization selected by `config`.
///
/// PostgreSQL when `database.url` is set, the file-backed store otherwise.
pub async fn connect(config: &Config) -> Result<Arc<dyn IdentityRepository>, StorageError> {
    if config.uses_database() {
        let repository = PostgresIdentityRepository::connect(
            &config.database.url,
            config.database.max_connections,
        )
        .await?;

        if config.database.run_migrations {
            repository
                .run_migrations()
                .await
                .map_err(|e| StorageError::Unavailable(format!("migrations failed: {}", e)))?;
        }

        return Ok(Arc::new(repository));
    }

    let repository = FileIdentityRepository::open(&config.storage.users_file).await?;
    Ok(Arc::new(repository))
}
