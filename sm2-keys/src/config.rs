//! Engine configuration shared by the signer, cipher, builder and verifier.

use serde::{Deserialize, Serialize};

use crate::error::{Result, Sm2Error};

/// Signer identity used when the caller does not supply one.
pub const DEFAULT_USER_ID: &[u8] = b"1234567812345678";

/// Upper bound on nonce draws for one signature.
pub const DEFAULT_SIGN_ATTEMPTS: usize = 100;

/// Upper bound on ephemeral key draws for one encryption.
pub const DEFAULT_ENCRYPT_ATTEMPTS: usize = 100;

/// PBKDF2 rounds used when sealing a private key with a passphrase.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

/// `ENTL` is a 16-bit bit length, so the identity is capped at 8191 bytes.
pub const MAX_USER_ID_LEN: usize = (u16::MAX as usize) / 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Distinguishing identifier hashed into `Z_A`
    pub user_id: Vec<u8>,
    /// Nonce draws allowed before signing gives up
    pub sign_attempts: usize,
    /// Ephemeral key draws allowed before encryption gives up
    pub encrypt_attempts: usize,
    /// PBKDF2-HMAC-SHA256 rounds for passphrase-protected keys
    pub pbkdf2_iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_vec(),
            sign_attempts: DEFAULT_SIGN_ATTEMPTS,
            encrypt_attempts: DEFAULT_ENCRYPT_ATTEMPTS,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<Vec<u8>>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_sign_attempts(mut self, attempts: usize) -> Self {
        self.sign_attempts = attempts;
        self
    }

    pub fn with_encrypt_attempts(mut self, attempts: usize) -> Self {
        self.encrypt_attempts = attempts;
        self
    }

    pub fn with_pbkdf2_iterations(mut self, iterations: u32) -> Self {
        self.pbkdf2_iterations = iterations;
        self
    }

    /// Check the values a component cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.is_empty() {
            return Err(Sm2Error::InvalidParameter(
                "user id must not be empty".to_string(),
            ));
        }
        if self.user_id.len() > MAX_USER_ID_LEN {
            return Err(Sm2Error::InvalidParameter(format!(
                "user id is {} bytes, at most {MAX_USER_ID_LEN} allowed",
                self.user_id.len()
            )));
        }
        if self.pbkdf2_iterations == 0 {
            return Err(Sm2Error::InvalidParameter(
                "pbkdf2 iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.user_id, b"1234567812345678");
        assert_eq!(cfg.sign_attempts, 100);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_unusable_values() {
        let empty = EngineConfig::new().with_user_id(Vec::new());
        assert!(matches!(
            empty.validate(),
            Err(Sm2Error::InvalidParameter(_))
        ));

        let long = EngineConfig::new().with_user_id(vec![b'a'; MAX_USER_ID_LEN + 1]);
        assert!(matches!(long.validate(), Err(Sm2Error::InvalidParameter(_))));

        let no_rounds = EngineConfig::new().with_pbkdf2_iterations(0);
        assert!(matches!(
            no_rounds.validate(),
            Err(Sm2Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn config_survives_serde() {
        let cfg = EngineConfig::new()
            .with_user_id(b"alice@example.com".to_vec())
            .with_sign_attempts(7);
        let bytes = bincode::serialize(&cfg).unwrap();
        let back: EngineConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(cfg, back);
    }
}
