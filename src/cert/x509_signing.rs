//! X.509 certificate signing.
//!
//! Authorities are self-signed: the template is both subject and issuer and is
//! signed with its own key. Leaves are signed with the authority's key and take
//! the authority's subject as their issuer.

use crate::cert::builder::Template;
use crate::cert::codec::{decode_certificate, decode_private_key};
use crate::crypto::ed25519::Keypair;
use crate::error::{Result, TlsForgeError};
use der::asn1::{BitString, Ia5String, OctetString};
use der::{Decode, Encode};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, SubjectAltName, SubjectKeyIdentifier,
};
use x509_cert::ext::{AsExtension, Extension};
use x509_cert::name::Name;

/// Key identifiers are the leading 160 bits of a SHA-256 digest.
const KEY_IDENTIFIER_LENGTH: usize = 20;

/// A signed certificate, both parsed and DER encoded.
#[derive(Debug, Clone)]
pub struct SignedCertificate {
    pub certificate: Certificate,
    pub der: Vec<u8>,
}

/// Authority key material loaded for signing leaves.
#[derive(Debug, Clone)]
pub struct Authority {
    pub keys: Keypair,
    pub certificate: Certificate,
}

impl Authority {
    /// Load an authority from its PEM key and PEM certificate.
    ///
    /// Any failure is a [`TlsForgeError::SigningError`]: without a usable
    /// authority no leaf can be signed.
    pub fn from_pem(key_pem: &[u8], cert_pem: &[u8]) -> Result<Self> {
        let keys = decode_private_key(key_pem)
            .and_then(|der| Keypair::from_pkcs8_der(&der))
            .map_err(|e| TlsForgeError::SigningError(format!("Failed to parse CA key: {}", e)))?;

        let certificate = decode_certificate(cert_pem)
            .and_then(|der| {
                Certificate::from_der(&der).map_err(|e| TlsForgeError::ParseError(e.to_string()))
            })
            .map_err(|e| {
                TlsForgeError::SigningError(format!("Failed to parse CA certificate: {}", e))
            })?;

        Ok(Self { keys, certificate })
    }
}

/// Self-sign an authority template with its own keypair.
///
/// # Example
///
/// ```
/// use tlsforge::cert::builder::build_authority_template;
/// use tlsforge::cert::spec::AuthoritySpec;
/// use tlsforge::cert::subject::Subject;
/// use tlsforge::cert::x509_signing::issue_authority;
/// use tlsforge::clock::SystemClock;
/// use tlsforge::crypto::ed25519::generate_ed25519_keypair;
///
/// # fn example() -> tlsforge::error::Result<()> {
/// let spec = AuthoritySpec::new(1, 10, Subject::with_common_name("My Root CA"));
/// let template = build_authority_template(&spec, &SystemClock)?;
/// let keypair = generate_ed25519_keypair()?;
/// let signed = issue_authority(&template, &keypair)?;
/// assert_eq!(
///     signed.certificate.tbs_certificate.issuer,
///     signed.certificate.tbs_certificate.subject
/// );
/// # Ok(())
/// # }
/// ```
pub fn issue_authority(template: &Template, keypair: &Keypair) -> Result<SignedCertificate> {
    if !template.is_ca() {
        return Err(TlsForgeError::SigningError(
            "Self-signing requires an authority template".to_string(),
        ));
    }

    let issuer = template.subject.clone(); // Self-signed
    let public_key = keypair.public_bytes();

    let mut extensions = base_extensions(template)?;
    let ski = SubjectKeyIdentifier(octets(&key_identifier(&public_key))?);
    push_extension(&mut extensions, &template.subject, &ski)?;

    sign_template(template, issuer, &keypair.public, extensions, &keypair.secret)
}

/// Sign a leaf template with the authority's key.
///
/// The authority certificate supplies the issuer name and authority key
/// identifier. It must be a CA certificate whose public key matches `ca_keys`.
pub fn issue_leaf(
    template: &Template,
    leaf_keys: &Keypair,
    ca_keys: &Keypair,
    ca_cert: &Certificate,
) -> Result<SignedCertificate> {
    if template.is_ca() {
        return Err(TlsForgeError::SigningError(
            "Authority-signing requires a leaf template".to_string(),
        ));
    }
    check_authority(ca_keys, ca_cert)?;

    let issuer = ca_cert.tbs_certificate.subject.clone(); // Issuer is the CA

    let mut extensions = base_extensions(template)?;
    if !template.dns_names.is_empty() {
        let san = SubjectAltName(
            template
                .dns_names
                .iter()
                .map(|name| {
                    Ia5String::new(name).map(GeneralName::DnsName).map_err(|e| {
                        TlsForgeError::TemplateError(format!("Invalid DNS name {:?}: {}", name, e))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        );
        push_extension(&mut extensions, &template.subject, &san)?;
    }
    let aki = AuthorityKeyIdentifier {
        key_identifier: Some(authority_key_identifier(ca_keys, ca_cert)?),
        authority_cert_issuer: None,
        authority_cert_serial_number: None,
    };
    push_extension(&mut extensions, &template.subject, &aki)?;

    // Sign with CA's key (not subject's key!)
    sign_template(template, issuer, &leaf_keys.public, extensions, &ca_keys.secret)
}

/// Extensions shared by both roles: basic constraints and (extended) key usage.
fn base_extensions(template: &Template) -> Result<Vec<Extension>> {
    let mut extensions = Vec::new();

    let bc = BasicConstraints {
        ca: template.is_ca(),
        path_len_constraint: None,
    };
    push_extension(&mut extensions, &template.subject, &bc)?;
    push_extension(&mut extensions, &template.subject, &template.key_usage)?;
    push_extension(
        &mut extensions,
        &template.subject,
        &template.extended_key_usage,
    )?;

    Ok(extensions)
}

fn push_extension(
    extensions: &mut Vec<Extension>,
    subject: &Name,
    value: &impl AsExtension,
) -> Result<()> {
    let extension = value
        .to_extension(subject, extensions.as_slice())
        .map_err(|e| TlsForgeError::SigningError(format!("Failed to encode extension: {}", e)))?;
    extensions.push(extension);
    Ok(())
}

fn sign_template(
    template: &Template,
    issuer: Name,
    subject_key: &VerifyingKey,
    extensions: Vec<Extension>,
    signing_key: &SigningKey,
) -> Result<SignedCertificate> {
    let signature_algorithm = ed25519_algorithm();

    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: template.serial_number.clone(),
        signature: signature_algorithm.clone(),
        issuer,
        validity: template.validity,
        subject: template.subject.clone(),
        subject_public_key_info: create_subject_public_key_info(subject_key)?,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(extensions),
    };

    let signature = sign_tbs(&tbs, signing_key)?;

    let certificate = Certificate {
        tbs_certificate: tbs,
        signature_algorithm,
        signature,
    };
    let der = certificate
        .to_der()
        .map_err(|e| TlsForgeError::SigningError(format!("Failed to encode certificate: {}", e)))?;

    Ok(SignedCertificate { certificate, der })
}

/// Reject authority material that cannot sign: not a CA, not Ed25519, or a
/// key that does not belong to the certificate.
fn check_authority(ca_keys: &Keypair, ca_cert: &Certificate) -> Result<()> {
    let tbs = &ca_cert.tbs_certificate;

    let is_ca = tbs
        .get::<BasicConstraints>()
        .map_err(|e| TlsForgeError::SigningError(format!("Invalid CA basic constraints: {}", e)))?
        .map(|(_, bc)| bc.ca)
        .unwrap_or(false);
    if !is_ca {
        return Err(TlsForgeError::SigningError(
            "CA certificate is not marked as a certificate authority".to_string(),
        ));
    }

    let spki = &tbs.subject_public_key_info;
    if spki.algorithm.oid != const_oid::db::rfc8410::ID_ED_25519 {
        return Err(TlsForgeError::SigningError(format!(
            "CA certificate key algorithm {} is not Ed25519",
            spki.algorithm.oid
        )));
    }
    if spki.subject_public_key.as_bytes() != Some(&ca_keys.public_bytes()[..]) {
        return Err(TlsForgeError::SigningError(
            "CA key does not match CA certificate".to_string(),
        ));
    }

    Ok(())
}

/// The authority's subject key identifier, or one derived from its key when
/// the certificate carries none.
fn authority_key_identifier(ca_keys: &Keypair, ca_cert: &Certificate) -> Result<OctetString> {
    let ski = ca_cert
        .tbs_certificate
        .get::<SubjectKeyIdentifier>()
        .map_err(|e| TlsForgeError::SigningError(format!("Invalid CA key identifier: {}", e)))?;

    match ski {
        Some((_, ski)) => Ok(ski.0),
        None => octets(&key_identifier(&ca_keys.public_bytes())),
    }
}

/// Leading 160 bits of SHA-256 over the public key bits.
pub fn key_identifier(public_key: &[u8]) -> Vec<u8> {
    Sha256::digest(public_key)[..KEY_IDENTIFIER_LENGTH].to_vec()
}

fn octets(bytes: &[u8]) -> Result<OctetString> {
    OctetString::new(bytes)
        .map_err(|e| TlsForgeError::SigningError(format!("Failed to encode key identifier: {}", e)))
}

fn create_subject_public_key_info(public_key: &VerifyingKey) -> Result<SubjectPublicKeyInfoOwned> {
    let public_key_bytes = public_key.to_bytes();
    let subject_public_key = BitString::from_bytes(&public_key_bytes)
        .map_err(|e| TlsForgeError::SigningError(format!("Failed to create bit string: {}", e)))?;

    Ok(SubjectPublicKeyInfoOwned {
        algorithm: ed25519_algorithm(),
        subject_public_key,
    })
}

pub(crate) fn ed25519_algorithm() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc8410::ID_ED_25519,
        parameters: None,
    }
}

/// Sign the DER encoding of the TBS certificate and check the result against
/// the signer's public key before handing it out.
fn sign_tbs(tbs: &TbsCertificate, signing_key: &SigningKey) -> Result<BitString> {
    let tbs_der = tbs
        .to_der()
        .map_err(|e| TlsForgeError::SigningError(format!("Failed to encode TBS: {}", e)))?;

    let signature: Signature = signing_key.sign(&tbs_der);
    signing_key
        .verifying_key()
        .verify_strict(&tbs_der, &signature)
        .map_err(|e| TlsForgeError::SigningError(format!("Signature self-check failed: {}", e)))?;

    BitString::from_bytes(&signature.to_bytes()).map_err(|e| {
        TlsForgeError::SigningError(format!("Failed to create signature bitstring: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::builder::{build_authority_template, build_leaf_template};
    use crate::cert::codec::{encode_certificate, encode_private_key};
    use crate::cert::spec::{AuthoritySpec, LeafSpec};
    use crate::cert::subject::Subject;
    use crate::clock::SystemClock;
    use crate::crypto::ed25519::generate_ed25519_keypair;
    use const_oid::db::rfc5280;
    use x509_cert::ext::pkix::{ExtendedKeyUsage, KeyUsage, KeyUsages};

    fn authority(common_name: &str) -> (Keypair, SignedCertificate) {
        let spec = AuthoritySpec::new(1, 10, Subject::with_common_name(common_name));
        let template = build_authority_template(&spec, &SystemClock).unwrap();
        let keypair = generate_ed25519_keypair().unwrap();
        let signed = issue_authority(&template, &keypair).unwrap();
        (keypair, signed)
    }

    fn leaf_template(dns_names: &[&str]) -> Template {
        let spec = LeafSpec::new(
            2,
            1,
            Subject::with_common_name("test.example.com"),
            dns_names.iter().map(|s| s.to_string()).collect(),
        );
        build_leaf_template(&spec, &SystemClock).unwrap()
    }

    fn dns_names(cert: &Certificate) -> Vec<String> {
        cert.tbs_certificate
            .get::<SubjectAltName>()
            .unwrap()
            .map(|(_, san)| {
                san.0
                    .iter()
                    .filter_map(|name| match name {
                        GeneralName::DnsName(dns) => Some(dns.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_issue_authority_is_self_signed_ca() {
        let (keypair, signed) = authority("Test CA");
        let tbs = &signed.certificate.tbs_certificate;

        assert_eq!(tbs.issuer, tbs.subject);

        let (critical, bc) = tbs.get::<BasicConstraints>().unwrap().unwrap();
        assert!(critical);
        assert!(bc.ca);

        let (_, ku) = tbs.get::<KeyUsage>().unwrap().unwrap();
        assert!(ku.0.contains(KeyUsages::DigitalSignature));
        assert!(ku.0.contains(KeyUsages::KeyCertSign));

        let (_, eku) = tbs.get::<ExtendedKeyUsage>().unwrap().unwrap();
        assert!(eku.0.contains(&rfc5280::ID_KP_CLIENT_AUTH));
        assert!(eku.0.contains(&rfc5280::ID_KP_SERVER_AUTH));

        let (_, ski) = tbs.get::<SubjectKeyIdentifier>().unwrap().unwrap();
        assert_eq!(ski.0.as_bytes(), key_identifier(&keypair.public_bytes()));
    }

    #[test]
    fn test_issue_authority_signature_verifies() {
        let (keypair, signed) = authority("Test CA");
        let tbs_der = signed.certificate.tbs_certificate.to_der().unwrap();
        let signature =
            Signature::from_slice(signed.certificate.signature.as_bytes().unwrap()).unwrap();

        assert!(keypair.public.verify_strict(&tbs_der, &signature).is_ok());
    }

    #[test]
    fn test_issue_authority_rejects_leaf_template() {
        let keypair = generate_ed25519_keypair().unwrap();
        let result = issue_authority(&leaf_template(&[]), &keypair);
        assert!(matches!(result, Err(TlsForgeError::SigningError(_))));
    }

    #[test]
    fn test_issue_leaf_links_to_authority() {
        let (ca_keys, ca) = authority("Root CA");
        let leaf_keys = generate_ed25519_keypair().unwrap();
        let template = leaf_template(&["test.example.com", "", "www.test.example.com"]);

        let signed = issue_leaf(&template, &leaf_keys, &ca_keys, &ca.certificate).unwrap();
        let tbs = &signed.certificate.tbs_certificate;

        assert_eq!(tbs.issuer, ca.certificate.tbs_certificate.subject);
        assert_ne!(tbs.issuer, tbs.subject);

        let (_, bc) = tbs.get::<BasicConstraints>().unwrap().unwrap();
        assert!(!bc.ca);

        let (_, ku) = tbs.get::<KeyUsage>().unwrap().unwrap();
        assert!(ku.0.contains(KeyUsages::DigitalSignature));
        assert!(!ku.0.contains(KeyUsages::KeyCertSign));

        assert_eq!(
            dns_names(&signed.certificate),
            vec!["test.example.com", "www.test.example.com"]
        );

        let (_, aki) = tbs.get::<AuthorityKeyIdentifier>().unwrap().unwrap();
        let (_, ca_ski) = ca
            .certificate
            .tbs_certificate
            .get::<SubjectKeyIdentifier>()
            .unwrap()
            .unwrap();
        assert_eq!(aki.key_identifier, Some(ca_ski.0));

        // Signed by the CA, carrying the leaf's own public key.
        let tbs_der = tbs.to_der().unwrap();
        let signature =
            Signature::from_slice(signed.certificate.signature.as_bytes().unwrap()).unwrap();
        assert!(ca_keys.public.verify_strict(&tbs_der, &signature).is_ok());
        assert!(leaf_keys.public.verify_strict(&tbs_der, &signature).is_err());
        assert_eq!(
            tbs.subject_public_key_info.subject_public_key.as_bytes(),
            Some(&leaf_keys.public_bytes()[..])
        );
    }

    #[test]
    fn test_issue_leaf_without_dns_names_has_no_san() {
        let (ca_keys, ca) = authority("Root CA");
        let leaf_keys = generate_ed25519_keypair().unwrap();

        let template = leaf_template(&[""]);
        let signed = issue_leaf(&template, &leaf_keys, &ca_keys, &ca.certificate).unwrap();
        assert!(signed
            .certificate
            .tbs_certificate
            .get::<SubjectAltName>()
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_issue_leaf_rejects_mismatched_ca_key() {
        let (_, ca) = authority("Root CA");
        let wrong_keys = generate_ed25519_keypair().unwrap();
        let leaf_keys = generate_ed25519_keypair().unwrap();

        let result = issue_leaf(&leaf_template(&[]), &leaf_keys, &wrong_keys, &ca.certificate);
        assert!(matches!(result, Err(TlsForgeError::SigningError(_))));
    }

    #[test]
    fn test_issue_leaf_rejects_non_ca_issuer() {
        let (ca_keys, ca) = authority("Root CA");
        let leaf_keys = generate_ed25519_keypair().unwrap();
        let leaf = issue_leaf(&leaf_template(&[]), &leaf_keys, &ca_keys, &ca.certificate).unwrap();

        let other_keys = generate_ed25519_keypair().unwrap();
        let result = issue_leaf(&leaf_template(&[]), &other_keys, &leaf_keys, &leaf.certificate);
        assert!(matches!(result, Err(TlsForgeError::SigningError(_))));
    }

    #[test]
    fn test_authority_from_pem() {
        let (ca_keys, ca) = authority("Root CA");
        let key_pem = encode_private_key(&ca_keys.to_pkcs8_der().unwrap());
        let cert_pem = encode_certificate(&ca.der);

        let loaded = Authority::from_pem(key_pem.as_bytes(), cert_pem.as_bytes()).unwrap();
        assert_eq!(loaded.keys.public_bytes(), ca_keys.public_bytes());
        assert_eq!(loaded.certificate, ca.certificate);
    }

    #[test]
    fn test_authority_from_pem_rejects_garbage() {
        let (_, ca) = authority("Root CA");
        let cert_pem = encode_certificate(&ca.der);

        let result = Authority::from_pem(b"invalid", cert_pem.as_bytes());
        assert!(matches!(result, Err(TlsForgeError::SigningError(_))));

        let stray_key = generate_ed25519_keypair().unwrap();
        let key_pem = encode_private_key(&stray_key.to_pkcs8_der().unwrap());
        let result = Authority::from_pem(key_pem.as_bytes(), b"invalid");
        assert!(matches!(result, Err(TlsForgeError::SigningError(_))));
    }
}
