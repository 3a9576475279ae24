//! Certificate authority issuance.
//!
//! This module provides the full pipeline for a self-signed authority:
//! template, fresh keypair, self-signature, PEM encoding.

use crate::cert::builder::build_authority_template;
use crate::cert::codec::IssuedMaterial;
use crate::cert::spec::AuthoritySpec;
use crate::cert::x509_signing::issue_authority;
use crate::clock::Clock;
use crate::crypto::ed25519::generate_ed25519_keypair;
use crate::error::{Result, TlsForgeError};

/// Create a self-signed certificate authority.
///
/// Errors are wrapped in [`TlsForgeError::Issuance`] naming the authority.
///
/// # Arguments
///
/// * `spec` - Serial, validity and subject of the authority
/// * `clock` - Source of the validity start
///
/// # Example
///
/// ```
/// use tlsforge::cert::ca::create_authority;
/// use tlsforge::cert::spec::AuthoritySpec;
/// use tlsforge::cert::subject::Subject;
/// use tlsforge::clock::SystemClock;
///
/// # fn example() -> tlsforge::error::Result<()> {
/// let spec = AuthoritySpec::new(1, 10, Subject::with_common_name("My Root CA"));
/// let material = create_authority(&spec, &SystemClock)?;
/// assert!(material.certificate.contains("BEGIN CERTIFICATE"));
/// assert!(material.private_key.contains("BEGIN PRIVATE KEY"));
/// # Ok(())
/// # }
/// ```
pub fn create_authority(spec: &AuthoritySpec, clock: &dyn Clock) -> Result<IssuedMaterial> {
    let material = issue(spec, clock).map_err(|e| TlsForgeError::for_subject(spec.label(), e))?;
    log::info!(
        "Issued certificate authority {:?} (serial {})",
        spec.label(),
        spec.serial
    );
    Ok(material)
}

fn issue(spec: &AuthoritySpec, clock: &dyn Clock) -> Result<IssuedMaterial> {
    let template = build_authority_template(spec, clock)?;
    let keypair = generate_ed25519_keypair()?;
    let signed = issue_authority(&template, &keypair)?;
    IssuedMaterial::encode(&keypair, &signed.der)
}
