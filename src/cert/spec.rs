//! Declarative descriptions of the certificates to issue.
//!
//! Specs are built by the caller (usually from the configuration document),
//! consumed once by issuance, and never retained.

use crate::cert::subject::Subject;
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// A certificate serial number of arbitrary precision.
///
/// Uniqueness within a trust domain is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Serial(pub BigUint);

impl Serial {
    /// Big-endian magnitude bytes, without any sign padding.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

impl From<u64> for Serial {
    fn from(value: u64) -> Self {
        Serial(BigUint::from(value))
    }
}

impl FromStr for Serial {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigUint::from_str(s.trim())
            .map(Serial)
            .map_err(|e| format!("invalid serial number {:?}: {}", s, e))
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for Serial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(value) => Ok(Serial::from(value)),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Everything needed to issue a self-signed certificate authority.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthoritySpec {
    pub serial: Serial,
    #[serde(alias = "validForYears")]
    pub valid_for_years: u32,
    #[serde(default)]
    pub subject: Subject,
}

/// Everything needed to issue a leaf certificate under an authority.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeafSpec {
    pub serial: Serial,
    #[serde(alias = "validForYears")]
    pub valid_for_years: u32,
    #[serde(default)]
    pub subject: Subject,
    /// DNS names for the subject alternative name extension. Empty entries are dropped.
    #[serde(default, alias = "dnsNames")]
    pub dns_names: Vec<String>,
}

impl AuthoritySpec {
    pub fn new(serial: impl Into<Serial>, valid_for_years: u32, subject: Subject) -> Self {
        Self {
            serial: serial.into(),
            valid_for_years,
            subject,
        }
    }

    /// Name used to identify this certificate in errors and logs.
    pub fn label(&self) -> String {
        label(&self.subject, &self.serial)
    }
}

impl LeafSpec {
    pub fn new(
        serial: impl Into<Serial>,
        valid_for_years: u32,
        subject: Subject,
        dns_names: Vec<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            valid_for_years,
            subject,
            dns_names,
        }
    }

    /// Name used to identify this certificate in errors and logs.
    pub fn label(&self) -> String {
        label(&self.subject, &self.serial)
    }
}

fn label(subject: &Subject, serial: &Serial) -> String {
    if subject.common_name.is_empty() {
        format!("serial {}", serial)
    } else {
        subject.common_name.clone()
    }
}
