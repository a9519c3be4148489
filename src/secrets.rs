//! Secret loading for the wallet keystore.
//!
//! The wallet encryption key protects every custodial secret at rest. It
//! must be provisioned externally and survive restarts: a key generated on
//! startup would silently orphan all previously sealed wallets, so a
//! missing or weak key is a hard startup failure, never a fallback.

use std::env;
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroizing;

pub const WALLET_KEY_ENV: &str = "MINTWATCH_WALLET_KEY";

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Secret validation failed: {0}")]
    ValidationFailed(String),
}

/// Load the wallet encryption key material, wrapped in `Zeroizing` so it is
/// wiped from memory on drop.
pub fn load_wallet_key() -> Result<Zeroizing<String>, SecretError> {
    let material = env::var(WALLET_KEY_ENV)
        .map(Zeroizing::new)
        .map_err(|_| SecretError::EnvVarNotSet(WALLET_KEY_ENV.to_string()))?;
    validate_secret_strength(&material, 16)?;
    Ok(material)
}

/// Reject obviously weak key material before it guards real funds.
pub fn validate_secret_strength(secret: &str, min_length: usize) -> Result<(), SecretError> {
    if secret.len() < min_length {
        return Err(SecretError::ValidationFailed(format!(
            "secret too short: {} characters (minimum: {})",
            secret.len(),
            min_length
        )));
    }

    let weak_patterns = ["test", "demo", "example", "placeholder", "changeme", "12345"];
    let lower = secret.to_lowercase();
    for pattern in &weak_patterns {
        if lower.contains(pattern) {
            warn!("wallet key material contains weak pattern: {}", pattern);
            return Err(SecretError::ValidationFailed(format!(
                "secret contains weak pattern: {}",
                pattern
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_validation() {
        assert!(validate_secret_strength("short", 16).is_err());
        assert!(validate_secret_strength("changeme-changeme-changeme", 16).is_err());
        assert!(validate_secret_strength("a strong and unique phrase", 16).is_ok());
    }
}
