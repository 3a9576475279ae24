//! PEM transport encoding for certificates and private keys.
//!
//! Certificates travel as `CERTIFICATE` blocks, private keys as PKCS#8
//! `PRIVATE KEY` blocks. Decoding takes the first block with the wanted label
//! and skips anything else in the input.

use crate::crypto::ed25519::Keypair;
use crate::error::{Result, TlsForgeError};
use pem::{EncodeConfig, LineEnding, Pem};
use rustls_pemfile::Item;
use std::io::Cursor;

/// PEM label for X.509 certificates.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// PEM label for PKCS#8 private keys.
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

const ENCODE_CONFIG: EncodeConfig = EncodeConfig::new().set_line_ending(LineEnding::LF);

/// A freshly issued certificate and its private key, both PEM encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedMaterial {
    pub private_key: String,
    pub certificate: String,
}

impl IssuedMaterial {
    /// Encode a keypair and a DER certificate for transport.
    pub fn encode(keypair: &Keypair, certificate_der: &[u8]) -> Result<Self> {
        Ok(Self {
            private_key: encode_private_key(&keypair.to_pkcs8_der()?),
            certificate: encode_certificate(certificate_der),
        })
    }
}

/// Wrap DER certificate bytes in a `CERTIFICATE` block.
pub fn encode_certificate(der: &[u8]) -> String {
    pem::encode_config(&Pem::new(CERTIFICATE_LABEL, der.to_vec()), ENCODE_CONFIG)
}

/// Wrap PKCS#8 DER key bytes in a `PRIVATE KEY` block.
pub fn encode_private_key(der: &[u8]) -> String {
    pem::encode_config(&Pem::new(PRIVATE_KEY_LABEL, der.to_vec()), ENCODE_CONFIG)
}

/// Extract the DER bytes of the first certificate block.
///
/// # Example
///
/// ```
/// use tlsforge::cert::codec::decode_certificate;
///
/// assert!(decode_certificate(b"invalid").is_err());
/// ```
pub fn decode_certificate(bytes: &[u8]) -> Result<Vec<u8>> {
    first_item(bytes, |item| match item {
        Item::X509Certificate(der) => Some(der.to_vec()),
        _ => None,
    })
}

/// Extract the DER bytes of every readable certificate block, in order.
///
/// A block that fails to read (bad base64, missing end line) is skipped and
/// scanning resumes after it. Returns an empty list when the input holds no
/// readable certificate blocks.
pub fn decode_certificates(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut cursor = Cursor::new(bytes);
    let mut certificates = Vec::new();

    loop {
        let position = cursor.position();
        match read_item(&mut cursor) {
            Ok(Some(Item::X509Certificate(der))) => certificates.push(der.to_vec()),
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => {
                log::debug!("Skipping PEM block at byte {}: {}", position, e);
                if cursor.position() == position {
                    break;
                }
            }
        }
    }

    certificates
}

/// Extract the PKCS#8 DER bytes of the first private key block.
pub fn decode_private_key(bytes: &[u8]) -> Result<Vec<u8>> {
    first_item(bytes, |item| match item {
        Item::Pkcs8Key(key) => Some(key.secret_pkcs8_der().to_vec()),
        _ => None,
    })
}

fn first_item<F>(bytes: &[u8], mut select: F) -> Result<Vec<u8>>
where
    F: FnMut(Item) -> Option<Vec<u8>>,
{
    let mut cursor = Cursor::new(bytes);

    while let Some(item) = read_item(&mut cursor)? {
        if let Some(der) = select(item) {
            return Ok(der);
        }
    }

    Err(TlsForgeError::ParseError("no block found".to_string()))
}

fn read_item(cursor: &mut Cursor<&[u8]>) -> Result<Option<Item>> {
    rustls_pemfile::read_one(cursor)
        .map_err(|e| TlsForgeError::ParseError(format!("Failed to read PEM: {}", e)))
}
