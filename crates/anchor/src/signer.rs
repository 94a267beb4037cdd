//! Signer identity passed to the anchorer per call

use crate::config::AnchorConfig;
use crate::error::AnchorError;

/// Capability that names the key vouching for an anchored batch.
///
/// Implementations typically front a KMS or HSM. The integrity core never
/// signs anything itself; it only records the key identifier.
pub trait SignerIdentity: Send + Sync {
    /// Key identifier recorded next to the root
    fn key_id(&self) -> Result<String, AnchorError>;
}

/// Signer with a fixed key identifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticSigner {
    key_id: String,
}

impl StaticSigner {
    /// Wrap a key identifier
    pub fn new(key_id: impl Into<String>) -> Self {
        Self { key_id: key_id.into() }
    }

    /// Use the key identifier from configuration
    pub fn from_config(config: &AnchorConfig) -> Result<Self, AnchorError> {
        config
            .signer_key_id
            .as_deref()
            .map(Self::new)
            .ok_or_else(|| AnchorError::Signer("ANCHOR_SIGNER_KID not configured".to_string()))
    }
}

impl SignerIdentity for StaticSigner {
    fn key_id(&self) -> Result<String, AnchorError> {
        if self.key_id.trim().is_empty() {
            return Err(AnchorError::Signer("empty key identifier".to_string()));
        }
        Ok(self.key_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = AnchorConfig::default();
        assert!(matches!(StaticSigner::from_config(&config), Err(AnchorError::Signer(_))));

        config.signer_key_id = Some("kms/aid-ops-1".to_string());
        let signer = StaticSigner::from_config(&config).unwrap();
        assert_eq!(signer.key_id().unwrap(), "kms/aid-ops-1");
    }

    #[test]
    fn test_empty_key_id_is_rejected() {
        assert!(matches!(StaticSigner::new("  ").key_id(), Err(AnchorError::Signer(_))));
    }
}
