//! Configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Anchoring configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Key identifier of the signer vouching for anchored batches
    pub signer_key_id: Option<String>,
    /// AIDProgram contract address
    pub contract_address: String,
    /// Chain the contract lives on
    pub chain_id: u64,
    /// Timeout for a single ledger call in seconds
    pub call_timeout_secs: u64,
    /// Attempts per ledger call, counting the first one
    pub max_attempts: u32,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            signer_key_id: None,
            contract_address: "0x0000000000000000000000000000000000000000".to_string(),
            chain_id: 11_155_111,
            call_timeout_secs: 30,
            max_attempts: 3,
        }
    }
}

impl AnchorConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            signer_key_id: env::var("ANCHOR_SIGNER_KID").ok().filter(|s| !s.is_empty()),
            contract_address: env::var("ANCHOR_CONTRACT_ADDRESS")
                .unwrap_or(defaults.contract_address),
            chain_id: env::var("ANCHOR_CHAIN_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.chain_id),
            call_timeout_secs: env::var("ANCHOR_CALL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.call_timeout_secs),
            max_attempts: env::var("ANCHOR_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_attempts),
        }
    }

    /// Per-call timeout
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnchorConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert!(config.signer_key_id.is_none());
    }

    #[test]
    fn test_zero_timeout_and_attempts_fall_back_to_defaults() {
        env::set_var("ANCHOR_CALL_TIMEOUT_SECS", "0");
        env::set_var("ANCHOR_MAX_ATTEMPTS", "0");
        let config = AnchorConfig::from_env();
        env::remove_var("ANCHOR_CALL_TIMEOUT_SECS");
        env::remove_var("ANCHOR_MAX_ATTEMPTS");

        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_attempts, 3);
    }
}
