//! Gateway configuration.
//!
//! Built once at startup and shared read-only between requests.

use std::collections::HashSet;

use crate::error::DomainError;

/// Collecting agents accepted when none are configured.
pub const DEFAULT_COLLECTING_AGENTS: &[&str] = &["BSM"];

/// Channels accepted when none are configured: teller, internet banking,
/// ATM, mobile banking and back-office flagging.
pub const DEFAULT_CHANNELS: &[&str] = &["TELLER", "IBANK", "ATM", "MBANK", "FLAGGING"];

/// Label of the single `rincian` line.
pub const DEFAULT_ITEM_DESCRIPTION: &str = "TAGIHAN SPP";

/// What the caller sees when the settlement write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettlementFailurePolicy {
    /// Return `ERR-DB` with HTTP 500.
    #[default]
    Surface,
    /// Log the failure and still return the success-shaped payload.
    Mask,
}

impl std::str::FromStr for SettlementFailurePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "surface" => Ok(SettlementFailurePolicy::Surface),
            "mask" => Ok(SettlementFailurePolicy::Mask),
            other => Err(DomainError::ValidationError(format!(
                "Unknown settlement failure policy: {} (expected surface or mask)",
                other
            ))),
        }
    }
}

/// Allow-lists, shared secret and display settings for the gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    biller_name: String,
    secret: String,
    collecting_agents: HashSet<String>,
    channels: HashSet<String>,
    item_description: String,
    failure_policy: SettlementFailurePolicy,
}

impl GatewayConfig {
    /// Creates a configuration with the default allow-lists.
    ///
    /// # Validation
    /// - Biller name and secret cannot be empty
    pub fn new(
        biller_name: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let biller_name = biller_name.into();
        let secret = secret.into();

        if biller_name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Biller name cannot be empty".into(),
            ));
        }
        if secret.is_empty() {
            return Err(DomainError::ValidationError(
                "Shared secret cannot be empty".into(),
            ));
        }

        Ok(Self {
            biller_name,
            secret,
            collecting_agents: to_set(DEFAULT_COLLECTING_AGENTS.iter().copied()),
            channels: to_set(DEFAULT_CHANNELS.iter().copied()),
            item_description: DEFAULT_ITEM_DESCRIPTION.to_string(),
            failure_policy: SettlementFailurePolicy::default(),
        })
    }

    /// Replaces the accepted collecting agents.
    pub fn with_collecting_agents<I, S>(mut self, agents: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.collecting_agents = to_set(agents);
        if self.collecting_agents.is_empty() {
            return Err(DomainError::ValidationError(
                "At least one collecting agent must be accepted".into(),
            ));
        }
        Ok(self)
    }

    /// Replaces the accepted channels.
    pub fn with_channels<I, S>(mut self, channels: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.channels = to_set(channels);
        if self.channels.is_empty() {
            return Err(DomainError::ValidationError(
                "At least one channel must be accepted".into(),
            ));
        }
        Ok(self)
    }

    pub fn with_item_description(mut self, description: impl Into<String>) -> Self {
        self.item_description = description.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: SettlementFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn biller_name(&self) -> &str {
        &self.biller_name
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn item_description(&self) -> &str {
        &self.item_description
    }

    pub fn failure_policy(&self) -> SettlementFailurePolicy {
        self.failure_policy
    }

    /// Accepted collecting agent codes, in no particular order.
    pub fn collecting_agents(&self) -> impl Iterator<Item = &str> {
        self.collecting_agents.iter().map(String::as_str)
    }

    pub fn accepts_collecting_agent(&self, bank_code: &str) -> bool {
        self.collecting_agents.contains(bank_code)
    }

    pub fn accepts_channel(&self, channel_code: &str) -> bool {
        self.channels.contains(channel_code)
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("biller_name", &self.biller_name)
            .field("secret", &"<redacted>")
            .field("collecting_agents", &self.collecting_agents)
            .field("channels", &self.channels)
            .field("item_description", &self.item_description)
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}

fn to_set<I, S>(items: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
