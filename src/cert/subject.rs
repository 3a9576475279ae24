//! Certificate subjects and their validation.

use crate::error::SubjectError;
use serde::Deserialize;

/// Distinguished-name attributes of a certificate subject.
///
/// Empty strings mean "absent": they are never encoded as empty attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Subject {
    pub country: String,
    pub organization: String,
    #[serde(alias = "organizationalUnit")]
    pub organizational_unit: String,
    pub locality: String,
    pub province: String,
    #[serde(alias = "streetAddress")]
    pub street_address: String,
    #[serde(alias = "postalCode")]
    pub postal_code: String,
    #[serde(alias = "serialNumber")]
    pub serial_number: String,
    #[serde(alias = "commonName")]
    pub common_name: String,
}

impl Subject {
    /// A subject with only a common name set.
    pub fn with_common_name(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..Default::default()
        }
    }

    /// Check the structural constraints on the subject fields.
    ///
    /// The common name is mandatory. The country is optional, but when present
    /// it must be exactly two bytes long and made of ASCII letters (either case).
    ///
    /// # Example
    ///
    /// ```
    /// use tlsforge::cert::subject::Subject;
    ///
    /// let mut subject = Subject::with_common_name("Test CA");
    /// subject.country = "US".to_string();
    /// assert!(subject.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), SubjectError> {
        if self.common_name.is_empty() {
            return Err(SubjectError::MissingCommonName);
        }

        if !self.country.is_empty() {
            if self.country.len() != 2 {
                return Err(SubjectError::InvalidCountryLength(self.country.len()));
            }
            if !self.country.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(SubjectError::InvalidCountryChars(self.country.clone()));
            }
        }

        Ok(())
    }
}
