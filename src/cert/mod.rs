//! Certificate issuance and verification.
//!
//! Issuance runs subject validation, template construction, key generation,
//! signing and PEM encoding. Verification checks a leaf against a set of
//! trusted authorities.

pub mod builder;
pub mod ca;
pub mod codec;
pub mod entity;
pub mod spec;
pub mod subject;
pub mod verify;
pub mod x509_signing;
