//! Certificate template construction.
//!
//! A [`Template`] is the unsigned description of a certificate: serial,
//! subject, validity window, role and key usages. Nothing is signed here; the
//! signer turns a template plus keys into a certificate.

use crate::cert::spec::{AuthoritySpec, LeafSpec, Serial};
use crate::cert::subject::Subject;
use crate::clock::Clock;
use crate::error::{Result, TlsForgeError};
use const_oid::db::{rfc4519, rfc5280};
use const_oid::ObjectIdentifier;
use der::asn1::{Any, GeneralizedTime, PrintableStringRef, SetOfVec, UtcTime, Utf8StringRef};
use der::DateTime;
use std::time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::{ExtendedKeyUsage, KeyUsage, KeyUsages};
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};

/// First year that must be encoded as GeneralizedTime (RFC 5280, 4.1.2.5).
const GENERALIZED_TIME_FROM_YEAR: u16 = 2050;

/// Whether a template describes a certificate authority or a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Authority,
    Leaf,
}

/// An unsigned certificate descriptor.
#[derive(Debug, Clone)]
pub struct Template {
    pub role: Role,
    pub serial_number: SerialNumber,
    pub subject: Name,
    pub validity: Validity,
    pub key_usage: KeyUsage,
    pub extended_key_usage: ExtendedKeyUsage,
    /// Non-empty DNS names for the subject alternative name extension.
    pub dns_names: Vec<String>,
}

impl Template {
    /// Whether the certificate will carry `cA=TRUE`.
    pub fn is_ca(&self) -> bool {
        self.role == Role::Authority
    }
}

/// Build the template for a self-signed certificate authority.
///
/// The subject is validated first; an invalid subject never produces a template.
///
/// # Example
///
/// ```
/// use tlsforge::cert::builder::build_authority_template;
/// use tlsforge::cert::spec::AuthoritySpec;
/// use tlsforge::cert::subject::Subject;
/// use tlsforge::clock::SystemClock;
///
/// let spec = AuthoritySpec::new(1, 1, Subject::with_common_name("Test CA"));
/// let template = build_authority_template(&spec, &SystemClock).unwrap();
/// assert!(template.is_ca());
/// ```
pub fn build_authority_template(spec: &AuthoritySpec, clock: &dyn Clock) -> Result<Template> {
    spec.subject.validate()?;

    Ok(Template {
        role: Role::Authority,
        serial_number: make_serial(&spec.serial)?,
        subject: build_subject_name(&spec.subject)?,
        validity: build_validity(clock.now(), spec.valid_for_years)?,
        key_usage: KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyCertSign),
        extended_key_usage: client_and_server_auth(),
        dns_names: Vec::new(),
    })
}

/// Build the template for a leaf certificate.
///
/// Empty entries in the DNS name list are dropped.
pub fn build_leaf_template(spec: &LeafSpec, clock: &dyn Clock) -> Result<Template> {
    spec.subject.validate()?;

    Ok(Template {
        role: Role::Leaf,
        serial_number: make_serial(&spec.serial)?,
        subject: build_subject_name(&spec.subject)?,
        validity: build_validity(clock.now(), spec.valid_for_years)?,
        key_usage: KeyUsage(KeyUsages::DigitalSignature.into()),
        extended_key_usage: client_and_server_auth(),
        dns_names: remove_empty(&spec.dns_names),
    })
}

/// Build the distinguished name for a subject, one attribute per RDN.
///
/// Empty fields are left out entirely rather than encoded as empty values.
pub fn build_subject_name(subject: &Subject) -> Result<Name> {
    let fields: [(ObjectIdentifier, &str, bool); 9] = [
        (rfc4519::C, subject.country.as_str(), true),
        (rfc4519::ST, subject.province.as_str(), false),
        (rfc4519::L, subject.locality.as_str(), false),
        (rfc4519::STREET, subject.street_address.as_str(), false),
        (rfc4519::POSTAL_CODE, subject.postal_code.as_str(), false),
        (rfc4519::O, subject.organization.as_str(), false),
        (rfc4519::OU, subject.organizational_unit.as_str(), false),
        (rfc4519::CN, subject.common_name.as_str(), false),
        (rfc4519::SERIAL_NUMBER, subject.serial_number.as_str(), true),
    ];

    let mut rdns = Vec::new();
    for (oid, value, printable) in fields {
        if value.is_empty() {
            continue;
        }
        rdns.push(single_attribute_rdn(oid, value, printable)?);
    }

    Ok(RdnSequence(rdns))
}

/// Encode one attribute as its own RDN. Attributes that prefer
/// PrintableString fall back to UTF8String when the value has characters
/// outside that set.
fn single_attribute_rdn(
    oid: ObjectIdentifier,
    value: &str,
    printable: bool,
) -> Result<RelativeDistinguishedName> {
    let encoded = match PrintableStringRef::new(value) {
        Ok(s) if printable => Any::encode_from(&s),
        _ => Utf8StringRef::new(value).and_then(|s| Any::encode_from(&s)),
    }
    .map_err(|e| TlsForgeError::TemplateError(format!("Invalid value for {}: {}", oid, e)))?;

    let mut attr_set = SetOfVec::new();
    attr_set
        .insert_ordered(AttributeTypeAndValue {
            oid,
            value: encoded,
        })
        .map_err(|e| TlsForgeError::TemplateError(format!("Failed to add attribute: {}", e)))?;

    Ok(RelativeDistinguishedName::from(attr_set))
}

/// Compute the validity window `[now, now + years]`.
///
/// `now` is truncated to whole seconds, since certificates cannot carry more.
pub fn build_validity(now: OffsetDateTime, years: u32) -> Result<Validity> {
    if years == 0 {
        return Err(TlsForgeError::TemplateError(
            "validity must be at least one year".to_string(),
        ));
    }

    let not_before = now
        .replace_nanosecond(0)
        .map_err(|e| TlsForgeError::TemplateError(format!("Invalid start time: {}", e)))?;
    let not_after = add_years(not_before, years)?;

    Ok(Validity {
        not_before: to_x509_time(not_before)?,
        not_after: to_x509_time(not_after)?,
    })
}

/// Same calendar instant `years` later. 29 February rolls to 1 March when the
/// target year is not a leap year.
fn add_years(start: OffsetDateTime, years: u32) -> Result<OffsetDateTime> {
    let year = i32::try_from(years)
        .ok()
        .and_then(|years| start.year().checked_add(years))
        .ok_or_else(|| {
            TlsForgeError::TemplateError(format!("Validity of {} years is too long", years))
        })?;

    match start.replace_year(year) {
        Ok(end) => Ok(end),
        Err(_) => {
            let end = start
                .replace_day(28)
                .and_then(|d| d.replace_year(year))
                .map_err(|e| TlsForgeError::TemplateError(format!("Validity out of range: {}", e)))?;
            Ok(end + time::Duration::days(1))
        }
    }
}

fn to_x509_time(instant: OffsetDateTime) -> Result<Time> {
    let seconds = u64::try_from(instant.unix_timestamp()).map_err(|_| {
        TlsForgeError::TemplateError(format!("{} predates the Unix epoch", instant))
    })?;
    let date_time = DateTime::from_unix_duration(Duration::from_secs(seconds))
        .map_err(|e| TlsForgeError::TemplateError(format!("Invalid certificate time: {}", e)))?;

    if date_time.year() < GENERALIZED_TIME_FROM_YEAR {
        let utc = UtcTime::from_date_time(date_time)
            .map_err(|e| TlsForgeError::TemplateError(format!("Invalid UTC time: {}", e)))?;
        Ok(Time::UtcTime(utc))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(date_time)))
    }
}

fn make_serial(serial: &Serial) -> Result<SerialNumber> {
    SerialNumber::new(&serial.to_bytes_be()).map_err(|e| {
        TlsForgeError::TemplateError(format!("Invalid serial number {}: {}", serial, e))
    })
}

fn client_and_server_auth() -> ExtendedKeyUsage {
    ExtendedKeyUsage(vec![rfc5280::ID_KP_CLIENT_AUTH, rfc5280::ID_KP_SERVER_AUTH])
}

/// Drop empty strings from a list.
pub fn remove_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .filter(|value| !value.is_empty())
        .cloned()
        .collect()
}
