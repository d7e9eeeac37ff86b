//! Configuration loading from environment.

use std::env;

use biller_types::GatewayConfig;
use biller_types::SettlementFailurePolicy;
use biller_types::config::{DEFAULT_CHANNELS, DEFAULT_COLLECTING_AGENTS, DEFAULT_ITEM_DESCRIPTION};

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub requests_per_minute: u32,
    pub gateway: GatewayConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = var("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT must be a valid port number: {}", e))?;

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let biller_name = var("BILLER_NAME")
            .ok_or_else(|| anyhow::anyhow!("BILLER_NAME environment variable is required"))?;

        let secret = var("BILLER_SECRET_KEY")
            .ok_or_else(|| anyhow::anyhow!("BILLER_SECRET_KEY environment variable is required"))?;

        let agents = list(var("ACCEPTED_COLLECTING_AGENTS"), DEFAULT_COLLECTING_AGENTS);
        let channels = list(var("ACCEPTED_CHANNELS"), DEFAULT_CHANNELS);

        let item_description =
            var("BILL_ITEM_DESCRIPTION").unwrap_or_else(|| DEFAULT_ITEM_DESCRIPTION.to_string());

        let failure_policy: SettlementFailurePolicy = match var("SETTLEMENT_FAILURE_POLICY") {
            Some(value) => value.parse()?,
            None => SettlementFailurePolicy::default(),
        };

        let requests_per_minute = var("RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|| "600".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("RATE_LIMIT_PER_MINUTE must be a number: {}", e))?;

        let gateway = GatewayConfig::new(biller_name, secret)?
            .with_collecting_agents(agents)?
            .with_channels(channels)?
            .with_item_description(item_description)
            .with_failure_policy(failure_policy);

        Ok(Self {
            port,
            database_url,
            requests_per_minute,
            gateway,
        })
    }
}

/// Splits a comma-separated list, falling back to `defaults` when unset.
fn list(value: Option<String>, defaults: &[&str]) -> Vec<String> {
    match value {
        Some(value) => value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => defaults.iter().map(|s| s.to_string()).collect(),
    }
}
