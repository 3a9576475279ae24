//! Error types for the tlsforge library.
//!
//! Every component fails fast with a typed error. Subject and chain failures
//! have their own enums so callers can match on the exact reason; everything
//! else is folded into [`TlsForgeError`].

use thiserror::Error;

/// A certificate subject failed structural validation.
///
/// Always caused by caller data and always fixable by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubjectError {
    /// The common name is empty.
    #[error("common name is required")]
    MissingCommonName,

    /// The country code is present but not two characters long.
    #[error("country code must be ISO 3166-1 alpha-2 format (2 letters), got length {0}")]
    InvalidCountryLength(usize),

    /// The country code contains something other than ASCII letters.
    #[error("country code must contain only letters, got {0:?}")]
    InvalidCountryChars(String),
}

/// Trust-chain verification failed.
///
/// This is an expected outcome of verification, not an exceptional one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// None of the supplied authority blocks decoded into a certificate.
    #[error("untrusted authority material")]
    UntrustedAuthority,

    /// The leaf bytes contain no certificate block, or the block does not parse.
    #[error("malformed leaf")]
    MalformedLeaf,

    /// No trusted authority validates the leaf.
    #[error("no valid path")]
    NoValidPath,
}

/// The main error type for tlsforge operations.
#[derive(Error, Debug)]
pub enum TlsForgeError {
    /// Subject validation failed
    #[error("Invalid subject: {0}")]
    SubjectError(#[from] SubjectError),

    /// The certificate template could not be built
    #[error("Template error: {0}")]
    TemplateError(String),

    /// The entropy source or key arithmetic failed
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Authority material was unusable or the signing primitive failed
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Malformed transport bytes
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Trust-chain verification failed
    #[error("Certificate verification failed: {0}")]
    ChainError(#[from] ChainError),

    /// Storage I/O error
    #[error("Storage I/O error: {0}")]
    StorageError(#[from] std::io::Error),

    /// The configuration document could not be loaded
    #[error("configuration {stage} failed for {path}: {message}")]
    ConfigError {
        stage: &'static str,
        path: String,
        message: String,
    },

    /// An issuance call failed; `subject` names the certificate that failed.
    #[error("issuing certificate {subject:?} failed: {source}")]
    Issuance {
        subject: String,
        #[source]
        source: Box<TlsForgeError>,
    },
}

impl TlsForgeError {
    /// Wrap an error with the subject whose issuance produced it.
    pub fn for_subject(subject: impl Into<String>, source: TlsForgeError) -> Self {
        TlsForgeError::Issuance {
            subject: subject.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through any [`TlsForgeError::Issuance`] wrapping.
    pub fn root(&self) -> &TlsForgeError {
        match self {
            TlsForgeError::Issuance { source, .. } => source.root(),
            other => other,
        }
    }

    /// The subject validation failure behind this error, if that is what it is.
    pub fn subject_error(&self) -> Option<&SubjectError> {
        match self.root() {
            TlsForgeError::SubjectError(e) => Some(e),
            _ => None,
        }
    }

    /// The chain verification failure behind this error, if that is what it is.
    pub fn chain_error(&self) -> Option<&ChainError> {
        match self.root() {
            TlsForgeError::ChainError(e) => Some(e),
            _ => None,
        }
    }
}

/// A specialized Result type for tlsforge operations.
pub type Result<T> = std::result::Result<T, TlsForgeError>;
