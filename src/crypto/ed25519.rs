//! Ed25519 key operations.
//!
//! Every certificate gets a freshly generated keypair. Keys leave this module
//! as PKCS#8 DER, which the codec wraps into a `PRIVATE KEY` block.

use crate::error::{Result, TlsForgeError};
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;

/// Length of an Ed25519 secret seed and of a public key, in bytes.
pub const ED25519_KEY_LENGTH: usize = 32;

/// An Ed25519 keypair consisting of a secret key and public key.
#[derive(Debug, Clone)]
pub struct Keypair {
    pub secret: SigningKey,
    pub public: VerifyingKey,
}

impl Keypair {
    /// Create a new keypair from a signing key.
    pub fn from_secret(secret: SigningKey) -> Self {
        let public = secret.verifying_key();
        Self { secret, public }
    }

    /// Get the public key as bytes.
    pub fn public_bytes(&self) -> [u8; ED25519_KEY_LENGTH] {
        self.public.to_bytes()
    }

    /// Get the secret key as bytes.
    pub fn secret_bytes(&self) -> [u8; ED25519_KEY_LENGTH] {
        self.secret.to_bytes()
    }

    /// Serialize the secret key as PKCS#8 DER.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let document = self.secret.to_pkcs8_der().map_err(|e| {
            TlsForgeError::KeyGenerationError(format!("Failed to encode private key: {}", e))
        })?;
        Ok(document.as_bytes().to_vec())
    }

    /// Load a keypair from PKCS#8 DER.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let secret = SigningKey::from_pkcs8_der(der)
            .map_err(|e| TlsForgeError::ParseError(format!("Invalid PKCS#8 Ed25519 key: {}", e)))?;
        Ok(Self::from_secret(secret))
    }
}

/// Generate a new Ed25519 keypair from the operating system's entropy source.
///
/// The only failure mode is the entropy source refusing to produce bytes,
/// which is reported as [`TlsForgeError::KeyGenerationError`].
///
/// # Example
///
/// ```
/// use tlsforge::crypto::ed25519::generate_ed25519_keypair;
///
/// let keypair = generate_ed25519_keypair().unwrap();
/// assert_eq!(keypair.public_bytes().len(), 32);
/// ```
pub fn generate_ed25519_keypair() -> Result<Keypair> {
    let mut seed = [0u8; ED25519_KEY_LENGTH];
    OsRng.try_fill_bytes(&mut seed).map_err(|e| {
        TlsForgeError::KeyGenerationError(format!("Entropy source failed: {}", e))
    })?;

    let secret = SigningKey::from_bytes(&seed);
    Ok(Keypair::from_secret(secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keypair_produces_valid_keys() {
        let keypair = generate_ed25519_keypair().unwrap();

        assert_eq!(keypair.public_bytes().len(), 32);
        assert_eq!(keypair.secret_bytes().len(), 32);

        let derived = keypair.secret.verifying_key();
        assert_eq!(derived.to_bytes(), keypair.public_bytes());
    }

    #[test]
    fn test_generate_keypair_produces_different_keys() {
        let keypair1 = generate_ed25519_keypair().unwrap();
        let keypair2 = generate_ed25519_keypair().unwrap();

        assert_ne!(keypair1.public_bytes(), keypair2.public_bytes());
        assert_ne!(keypair1.secret_bytes(), keypair2.secret_bytes());
    }

    #[test]
    fn test_pkcs8_roundtrip_preserves_key() {
        let original = generate_ed25519_keypair().unwrap();
        let der = original.to_pkcs8_der().unwrap();
        let loaded = Keypair::from_pkcs8_der(&der).unwrap();

        assert_eq!(original.secret_bytes(), loaded.secret_bytes());
        assert_eq!(original.public_bytes(), loaded.public_bytes());
    }

    #[test]
    fn test_pkcs8_rejects_garbage() {
        let result = Keypair::from_pkcs8_der(b"not a key");
        assert!(matches!(result, Err(TlsForgeError::ParseError(_))));
    }
}
