//! Leaf-to-authority chain verification.
//!
//! A fresh [`TrustStore`] is built from the caller's authority bytes on every
//! call. The leaf is checked against each trusted authority; every authority
//! that validates it yields a [`TrustPath`].

use crate::cert::codec::{decode_certificate, decode_certificates};
use crate::clock::{Clock, SystemClock};
use crate::crypto::ed25519::ED25519_KEY_LENGTH;
use crate::error::ChainError;
use const_oid::db::{rfc5280, rfc8410};
use der::{Decode, Encode};
use ed25519_dalek::{Signature, VerifyingKey};
use x509_cert::ext::pkix::{BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages};
use x509_cert::Certificate;

/// Trusted authority certificates for a single verification call.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    anchors: Vec<Certificate>,
}

impl TrustStore {
    /// Build a store from every certificate block in `bytes`.
    ///
    /// Blocks that cannot be read or do not parse are skipped. Fails with
    /// [`ChainError::UntrustedAuthority`] when nothing usable remains.
    pub fn from_pem(bytes: &[u8]) -> Result<Self, ChainError> {
        let blocks = decode_certificates(bytes);

        let mut store = TrustStore::default();
        for (index, der) in blocks.iter().enumerate() {
            match Certificate::from_der(der) {
                Ok(cert) => store.add(cert),
                Err(e) => log::debug!("Skipping authority block {}: {}", index, e),
            }
        }

        if store.is_empty() {
            return Err(ChainError::UntrustedAuthority);
        }
        Ok(store)
    }

    /// Add an authority; duplicates are ignored.
    pub fn add(&mut self, cert: Certificate) {
        if !self.anchors.contains(&cert) {
            self.anchors.push(cert);
        }
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn anchors(&self) -> &[Certificate] {
        &self.anchors
    }
}

/// One certificate on a trust path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub subject: String,
    pub issuer: String,
}

impl PathEntry {
    fn of(cert: &Certificate) -> Self {
        Self {
            subject: cert.tbs_certificate.subject.to_string(),
            issuer: cert.tbs_certificate.issuer.to_string(),
        }
    }
}

/// A validated path from the leaf (first) to a trusted authority (last).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPath {
    pub certificates: Vec<PathEntry>,
}

/// Successful verification: every trust path that validated the leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub paths: Vec<TrustPath>,
}

/// Verify a PEM leaf against PEM authorities at the current time.
///
/// # Example
///
/// ```
/// use tlsforge::cert::verify::verify;
/// use tlsforge::error::ChainError;
///
/// assert_eq!(
///     verify(b"invalid", b"invalid").unwrap_err(),
///     ChainError::UntrustedAuthority
/// );
/// ```
pub fn verify(leaf: &[u8], authorities: &[u8]) -> Result<Verification, ChainError> {
    verify_at(leaf, authorities, &SystemClock)
}

/// Verify a PEM leaf against PEM authorities at the clock's instant.
pub fn verify_at(
    leaf: &[u8],
    authorities: &[u8],
    clock: &dyn Clock,
) -> Result<Verification, ChainError> {
    let store = TrustStore::from_pem(authorities)?;

    let leaf = decode_certificate(leaf)
        .ok()
        .and_then(|der| Certificate::from_der(&der).ok())
        .ok_or(ChainError::MalformedLeaf)?;

    let now = clock.now().unix_timestamp();
    let mut paths = Vec::new();

    for anchor in store.anchors() {
        match check_path(&leaf, anchor, now) {
            Ok(()) => paths.push(trust_path(&leaf, anchor)),
            Err(reason) => log::debug!(
                "Authority {} rejected: {}",
                anchor.tbs_certificate.subject,
                reason
            ),
        }
    }

    if paths.is_empty() {
        return Err(ChainError::NoValidPath);
    }

    for (chain, path) in paths.iter().enumerate() {
        for (position, entry) in path.certificates.iter().enumerate() {
            log::debug!(
                "Chain {} Certificate {}: Subject: {}, Issuer: {}",
                chain,
                position,
                entry.subject,
                entry.issuer
            );
        }
    }

    Ok(Verification { paths })
}

fn trust_path(leaf: &Certificate, anchor: &Certificate) -> TrustPath {
    let mut certificates = vec![PathEntry::of(leaf)];
    if leaf != anchor {
        certificates.push(PathEntry::of(anchor));
    }
    TrustPath { certificates }
}

/// Check one leaf/anchor pair. The error is a human-readable reason.
fn check_path(leaf: &Certificate, anchor: &Certificate, now: i64) -> Result<(), String> {
    if leaf.tbs_certificate.issuer != anchor.tbs_certificate.subject {
        return Err("issuer does not match authority subject".to_string());
    }

    check_authority_flags(anchor)?;
    check_signature(leaf, anchor)?;
    check_validity(leaf, now).map_err(|e| format!("leaf {}", e))?;
    check_validity(anchor, now).map_err(|e| format!("authority {}", e))?;
    check_server_usage(leaf)
}

fn check_authority_flags(anchor: &Certificate) -> Result<(), String> {
    let tbs = &anchor.tbs_certificate;

    let is_ca = tbs
        .get::<BasicConstraints>()
        .map_err(|e| format!("invalid basic constraints: {}", e))?
        .map(|(_, bc)| bc.ca)
        .unwrap_or(false);
    if !is_ca {
        return Err("authority is not a CA".to_string());
    }

    let key_usage = tbs
        .get::<KeyUsage>()
        .map_err(|e| format!("invalid key usage: {}", e))?;
    if let Some((_, ku)) = key_usage {
        if !ku.0.contains(KeyUsages::KeyCertSign) {
            return Err("authority key usage does not allow certificate signing".to_string());
        }
    }

    Ok(())
}

fn check_signature(leaf: &Certificate, anchor: &Certificate) -> Result<(), String> {
    if leaf.signature_algorithm.oid != rfc8410::ID_ED_25519
        || leaf.tbs_certificate.signature.oid != rfc8410::ID_ED_25519
    {
        return Err(format!(
            "unsupported signature algorithm {}",
            leaf.signature_algorithm.oid
        ));
    }

    let spki = &anchor.tbs_certificate.subject_public_key_info;
    if spki.algorithm.oid != rfc8410::ID_ED_25519 {
        return Err(format!("unsupported authority key {}", spki.algorithm.oid));
    }

    let key_bytes: [u8; ED25519_KEY_LENGTH] = spki
        .subject_public_key
        .as_bytes()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or("malformed authority key")?;
    let key = VerifyingKey::from_bytes(&key_bytes).map_err(|e| e.to_string())?;

    let signature = leaf
        .signature
        .as_bytes()
        .ok_or("malformed signature")
        .and_then(|bytes| Signature::from_slice(bytes).map_err(|_| "malformed signature"))?;

    let tbs_der = leaf
        .tbs_certificate
        .to_der()
        .map_err(|e| format!("cannot encode leaf: {}", e))?;

    key.verify_strict(&tbs_der, &signature)
        .map_err(|_| "signature does not verify".to_string())
}

fn check_validity(cert: &Certificate, now: i64) -> Result<(), String> {
    let validity = &cert.tbs_certificate.validity;
    let not_before = validity.not_before.to_unix_duration().as_secs();
    let not_after = validity.not_after.to_unix_duration().as_secs();

    // Negative instants predate every certificate.
    let now = u64::try_from(now).map_err(|_| "is not yet valid".to_string())?;
    if now < not_before {
        return Err("is not yet valid".to_string());
    }
    if now > not_after {
        return Err("has expired".to_string());
    }
    Ok(())
}

fn check_server_usage(leaf: &Certificate) -> Result<(), String> {
    let eku = leaf
        .tbs_certificate
        .get::<ExtendedKeyUsage>()
        .map_err(|e| format!("invalid extended key usage: {}", e))?;

    match eku {
        Some((_, eku))
            if !eku.0.contains(&rfc5280::ID_KP_SERVER_AUTH)
                && !eku.0.contains(&rfc5280::ANY_EXTENDED_KEY_USAGE) =>
        {
            Err("leaf is not valid for server authentication".to_string())
        }
        _ => Ok(()),
    }
}
