use thiserror::Error;

use crate::db::traits::SyncDatabaseError;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

impl From<SqliteDatabaseError> for SyncDatabaseError {
    fn from(e: SqliteDatabaseError) -> Self {
        SyncDatabaseError::DatabaseError(e.to_string())
    }
}
