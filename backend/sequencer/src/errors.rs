//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Ledger(#[from] dao_ledger::Error),

    #[error("Journal replay failed at operation {sequence}: {source}")]
    Replay {
        sequence: i64,
        source: dao_ledger::Error,
    },

    #[error("Ledger invariant violated: {0}")]
    Invariant(#[from] dao_ledger::InvariantViolation),

    #[error("Corrupt journal row: {0}")]
    Corrupt(String),

    #[error("Sequencer is not running")]
    Unavailable,
}

pub type Result<T> = std::result::Result<T, NodeError>;
