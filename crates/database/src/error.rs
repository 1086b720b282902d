use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database connection settings: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("account {0} does not exist")]
    AccountNotFound(String),

    #[error("account name {0} is already taken")]
    Conflict(String),

    #[error("Stored row could not be decoded: {0}")]
    Corrupt(String),
}
