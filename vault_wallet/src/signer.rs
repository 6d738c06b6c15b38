use alloy::signers::local::PrivateKeySigner;
use anyhow::{anyhow, Result};
use std::env;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const PRIVATE_KEY_ENV: &str = "VAULT_PRIVATE_KEY";

/// Hex private key held only as long as needed, zeroized on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    data: String,
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl SecretKey {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    /// Build the signer; the key itself never appears in the error
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        self.data
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|_| anyhow!("Invalid private key: expected 32 bytes of hex"))
    }
}

/// Resolve the signing key: explicit argument, then `VAULT_PRIVATE_KEY`,
/// then an interactive prompt.
pub fn resolve_key(explicit: Option<String>) -> Result<SecretKey> {
    if let Some(key) = explicit {
        return Ok(SecretKey::new(key));
    }
    if let Ok(key) = env::var(PRIVATE_KEY_ENV) {
        if !key.trim().is_empty() {
            return Ok(SecretKey::new(key));
        }
    }

    let key = rpassword::prompt_password("Enter private key: ")
        .map_err(|e| anyhow!("Failed to read private key: {}", e))?;
    Ok(SecretKey::new(key))
}

pub fn load_signer(explicit: Option<String>) -> Result<PrivateKeySigner> {
    resolve_key(explicit)?.signer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    // secret scalar 1, never funded on a real network
    const DEV_KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

    #[test]
    fn test_signer_from_hex() {
        let signer = SecretKey::new(DEV_KEY).signer().unwrap();
        assert_eq!(
            signer.address(),
            address!("7E5F4552091A69125d5DfCb7b8C2659029395Bdf")
        );

        let unprefixed = SecretKey::new(DEV_KEY.trim_start_matches("0x")).signer().unwrap();
        assert_eq!(unprefixed.address(), signer.address());
    }

    #[test]
    fn test_invalid_key_is_not_echoed() {
        let err = SecretKey::new("0xnot-a-key").signer().unwrap_err();
        assert!(!err.to_string().contains("not-a-key"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SecretKey::new(DEV_KEY);
        assert_eq!(format!("{:?}", key), "[REDACTED]");
    }

    #[test]
    fn test_explicit_key_wins() {
        let key = resolve_key(Some(DEV_KEY.to_string())).unwrap();
        assert!(key.signer().is_ok());
    }
}
