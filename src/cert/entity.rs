//! Leaf certificate issuance.
//!
//! This module provides the pipeline for a leaf signed by an existing
//! authority: template, authority material, fresh keypair, signature, PEM
//! encoding.

use crate::cert::builder::{build_leaf_template, Template};
use crate::cert::codec::IssuedMaterial;
use crate::cert::spec::LeafSpec;
use crate::cert::x509_signing::{issue_leaf, Authority};
use crate::clock::Clock;
use crate::crypto::ed25519::generate_ed25519_keypair;
use crate::error::{Result, TlsForgeError};

/// Create a leaf certificate signed by the authority given as PEM.
///
/// The template is built (and the subject validated) before the authority
/// material is looked at, so subject errors win over unusable authorities.
///
/// # Arguments
///
/// * `spec` - Serial, validity, subject and DNS names of the leaf
/// * `ca_key_pem` - The authority's `PRIVATE KEY` block
/// * `ca_cert_pem` - The authority's `CERTIFICATE` block
/// * `clock` - Source of the validity start
///
/// # Example
///
/// ```
/// use tlsforge::cert::ca::create_authority;
/// use tlsforge::cert::entity::create_leaf_from_pem;
/// use tlsforge::cert::spec::{AuthoritySpec, LeafSpec};
/// use tlsforge::cert::subject::Subject;
/// use tlsforge::clock::SystemClock;
///
/// # fn example() -> tlsforge::error::Result<()> {
/// let ca_spec = AuthoritySpec::new(1, 10, Subject::with_common_name("Root CA"));
/// let ca = create_authority(&ca_spec, &SystemClock)?;
///
/// let leaf_spec = LeafSpec::new(
///     2,
///     1,
///     Subject::with_common_name("example.com"),
///     vec!["example.com".to_string()],
/// );
/// let leaf = create_leaf_from_pem(
///     &leaf_spec,
///     ca.private_key.as_bytes(),
///     ca.certificate.as_bytes(),
///     &SystemClock,
/// )?;
/// assert!(leaf.certificate.contains("BEGIN CERTIFICATE"));
/// # Ok(())
/// # }
/// ```
pub fn create_leaf_from_pem(
    spec: &LeafSpec,
    ca_key_pem: &[u8],
    ca_cert_pem: &[u8],
    clock: &dyn Clock,
) -> Result<IssuedMaterial> {
    let material = build_leaf_template(spec, clock)
        .and_then(|template| {
            let authority = Authority::from_pem(ca_key_pem, ca_cert_pem)?;
            sign(&template, &authority)
        })
        .map_err(|e| TlsForgeError::for_subject(spec.label(), e))?;

    log_issued(spec);
    Ok(material)
}

/// Create a leaf certificate signed by an already loaded authority.
///
/// Use this when issuing many leaves under one authority; the authority is
/// only read, so it can be shared across threads.
pub fn create_leaf(
    spec: &LeafSpec,
    authority: &Authority,
    clock: &dyn Clock,
) -> Result<IssuedMaterial> {
    let material = build_leaf_template(spec, clock)
        .and_then(|template| sign(&template, authority))
        .map_err(|e| TlsForgeError::for_subject(spec.label(), e))?;

    log_issued(spec);
    Ok(material)
}

fn sign(template: &Template, authority: &Authority) -> Result<IssuedMaterial> {
    let keypair = generate_ed25519_keypair()?;
    let signed = issue_leaf(template, &keypair, &authority.keys, &authority.certificate)?;
    IssuedMaterial::encode(&keypair, &signed.der)
}

fn log_issued(spec: &LeafSpec) {
    log::info!(
        "Issued certificate {:?} (serial {}) for DNS names {:?}",
        spec.label(),
        spec.serial,
        spec.dns_names
    );
}
