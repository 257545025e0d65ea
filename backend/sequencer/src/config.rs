//! Application configuration loaded from environment variables.

use dao_ledger::{Address, LedgerConfig};

use crate::errors::{NodeError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite journal
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Identity that administers the ledger
    pub admin: Address,
    /// Ledger parameters used when no genesis row exists yet
    pub ledger: LedgerConfig,
    /// Genesis timestamp; defaults to the wall clock at first start
    pub genesis_timestamp: Option<u64>,
    /// Submissions that may wait for the sequencer before callers block
    pub queue_depth: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: var("DATABASE_URL", "sqlite:./dao_ledger.db"),
            api_port: parse(&var("API_PORT", "3002"), "API_PORT")?,
            admin: lookup("ADMIN_ADDRESS")
                .ok_or_else(|| {
                    NodeError::Config("ADMIN_ADDRESS environment variable is required".to_string())
                })?
                .parse()
                .map_err(|_| NodeError::Config("Invalid ADMIN_ADDRESS".to_string()))?,
            ledger: LedgerConfig {
                contribution_duration: parse(
                    &var("CONTRIBUTION_DURATION_SECS", "604800"),
                    "CONTRIBUTION_DURATION_SECS",
                )?,
                vote_duration: parse(&var("VOTE_DURATION_SECS", "86400"), "VOTE_DURATION_SECS")?,
                quorum_percent: parse(&var("QUORUM_PERCENT", "67"), "QUORUM_PERCENT")?,
            },
            genesis_timestamp: lookup("GENESIS_TIMESTAMP")
                .map(|v| parse(&v, "GENESIS_TIMESTAMP"))
                .transpose()?,
            queue_depth: parse(&var("SUBMISSION_QUEUE_DEPTH", "256"), "SUBMISSION_QUEUE_DEPTH")?,
        })
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| NodeError::Config(format!("Invalid {key}")))
}
