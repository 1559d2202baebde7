//! Application configuration loaded from environment variables.

use crate::errors::{IndexerError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Soroban RPC endpoint (e.g. https://soroban-testnet.stellar.org)
    pub rpc_url: String,
    /// The token sale contract address (Strkey format)
    pub sale_contract_id: String,
    /// The claim distributor contract address, once deployed
    pub claim_contract_id: Option<String>,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) to poll the RPC for new events
    pub poll_interval_secs: u64,
    /// Maximum number of events to fetch per RPC request
    pub events_per_page: u32,
    /// Ledger to start from if no cursor is saved
    pub start_ledger: u32,
    /// Default number of entries returned by `/feed`
    pub feed_limit: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            rpc_url: env_var("RPC_URL")
                .unwrap_or_else(|_| "https://soroban-testnet.stellar.org".to_string()),
            sale_contract_id: env_var("SALE_CONTRACT_ID").map_err(|_| {
                IndexerError::Config("SALE_CONTRACT_ID environment variable is required".to_string())
            })?,
            claim_contract_id: env_var("CLAIM_CONTRACT_ID")
                .ok()
                .filter(|id| !id.trim().is_empty()),
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./token_sale_events.db".to_string()),
            api_port: parse_or("API_PORT", 3001)?,
            poll_interval_secs: parse_or("POLL_INTERVAL_SECS", 5)?,
            events_per_page: parse_or("EVENTS_PER_PAGE", 100)?,
            start_ledger: parse_or("START_LEDGER", 0)?,
            feed_limit: parse_or("FEED_LIMIT", 50)?,
        })
    }

    /// Every contract whose events are indexed.
    pub fn contract_ids(&self) -> Vec<String> {
        std::iter::once(self.sale_contract_id.clone())
            .chain(self.claim_contract_id.clone())
            .collect()
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| IndexerError::Config(format!("Missing env var: {key}")))
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| IndexerError::Config(format!("Invalid {key}"))),
        Err(_) => Ok(default),
    }
}
