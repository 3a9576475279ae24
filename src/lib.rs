//! tlsforge: Ed25519 X.509 authorities, leaf certificates and chain checks
//!
//! This library issues and verifies certificates for a two-tier trust
//! domain. It enables users to:
//!
//! - Describe certificate subjects declaratively and validate them
//! - Issue self-signed certificate authorities with fresh Ed25519 keys
//! - Issue leaf certificates for DNS names, signed by such an authority
//! - Verify that a leaf chains to one of a set of trusted authorities
//!
//! # Architecture
//!
//! Issuance is a pipeline of small functions: subject validation, template
//! construction, key generation, signing, PEM encoding. Verification is a
//! separate flow over caller-supplied PEM bytes. Nothing holds shared mutable
//! state, so independent issuances can run in parallel. All operations return
//! `Result` types; no `unwrap()` or panic.
//!
//! # Example
//!
//! ```
//! use tlsforge::cert::ca::create_authority;
//! use tlsforge::cert::entity::create_leaf_from_pem;
//! use tlsforge::cert::spec::{AuthoritySpec, LeafSpec};
//! use tlsforge::cert::subject::Subject;
//! use tlsforge::cert::verify::verify;
//! use tlsforge::clock::SystemClock;
//!
//! fn example() -> tlsforge::Result<()> {
//!     let ca = create_authority(
//!         &AuthoritySpec::new(1, 10, Subject::with_common_name("Example CA")),
//!         &SystemClock,
//!     )?;
//!     let leaf = create_leaf_from_pem(
//!         &LeafSpec::new(
//!             2,
//!             1,
//!             Subject::with_common_name("example.com"),
//!             vec!["example.com".to_string()],
//!         ),
//!         ca.private_key.as_bytes(),
//!         ca.certificate.as_bytes(),
//!         &SystemClock,
//!     )?;
//!
//!     let verification = verify(leaf.certificate.as_bytes(), ca.certificate.as_bytes())?;
//!     assert_eq!(verification.paths.len(), 1);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod cert;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod storage;

// Re-export commonly used types
pub use cert::codec::IssuedMaterial;
pub use cert::spec::{AuthoritySpec, LeafSpec, Serial};
pub use cert::subject::Subject;
pub use error::{ChainError, Result, SubjectError, TlsForgeError};
