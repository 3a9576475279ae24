//! Cryptographic primitives.
//!
//! Certificates are signed with Ed25519. A keypair is generated fresh for every
//! issued certificate and never reused.
//!
//! # Example
//!
//! ```rust
//! use tlsforge::crypto::ed25519::{generate_ed25519_keypair, Keypair};
//!
//! # fn example() -> tlsforge::error::Result<()> {
//! let keypair = generate_ed25519_keypair()?;
//! let der = keypair.to_pkcs8_der()?;
//! let restored = Keypair::from_pkcs8_der(&der)?;
//! assert_eq!(keypair.public_bytes(), restored.public_bytes());
//! # Ok(())
//! # }
//! ```

pub mod ed25519;
