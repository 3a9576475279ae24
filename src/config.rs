//! Configuration document describing the certificates to issue.
//!
//! The document is TOML with one `[ca_cert]` section and any number of
//! `[certs.NAME]` sections:
//!
//! ```toml
//! [ca_cert]
//! serial = 1
//! valid_for_years = 10
//! [ca_cert.subject]
//! country = "US"
//! common_name = "Example CA"
//!
//! [certs.server]
//! serial = 2
//! valid_for_years = 1
//! dns_names = ["example.com", "www.example.com"]
//! [certs.server.subject]
//! common_name = "example.com"
//! ```

use crate::cert::spec::{AuthoritySpec, LeafSpec};
use crate::error::{Result, TlsForgeError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file used when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "tls.toml";

/// File stem reserved for the authority's own key and certificate.
const RESERVED_NAME: &str = "ca";

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(alias = "caCert")]
    ca_cert: Option<AuthoritySpec>,
    #[serde(default)]
    certs: BTreeMap<String, LeafSpec>,
}

/// A loaded and validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Absolute path the configuration was loaded from.
    pub path: PathBuf,
    pub ca_cert: AuthoritySpec,
    /// Leaf specs by name, in name order.
    pub certs: BTreeMap<String, LeafSpec>,
}

impl Config {
    /// Load and validate the configuration at `path`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tlsforge::config::Config;
    /// use std::path::Path;
    ///
    /// # fn example() -> tlsforge::error::Result<()> {
    /// let config = Config::load(Path::new("tls.toml"))?;
    /// println!("{} leaf certificates configured", config.certs.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let path = resolve(path)?;

        let text = fs::read_to_string(&path)
            .map_err(|e| config_error("reading", &path, e.to_string()))?;

        Self::parse(&text, path)
    }

    /// Parse and validate a configuration document. `path` is only used for
    /// error messages and recorded as the source.
    pub fn parse(text: &str, path: PathBuf) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|e| config_error("parsing", &path, e.to_string()))?;

        let ca_cert = raw.ca_cert.ok_or_else(|| {
            config_error(
                "validation",
                &path,
                "certificate authority configuration is missing".to_string(),
            )
        })?;

        if raw.certs.is_empty() {
            return Err(config_error(
                "validation",
                &path,
                "no certificates configured".to_string(),
            ));
        }

        for name in raw.certs.keys() {
            validate_name(name).map_err(|message| config_error("validation", &path, message))?;
        }

        Ok(Self {
            path,
            ca_cert,
            certs: raw.certs,
        })
    }

    /// The leaf spec configured under `name`.
    pub fn leaf(&self, name: &str) -> Result<&LeafSpec> {
        self.certs.get(name).ok_or_else(|| {
            config_error(
                "validation",
                &self.path,
                format!("certificate {:?} is not configured", name),
            )
        })
    }
}

fn resolve(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    std::env::current_dir()
        .map(|dir| dir.join(path))
        .map_err(|e| config_error("path resolution", path, e.to_string()))
}

/// Leaf names become file stems, so they must be plain file names.
fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(format!("invalid certificate name {:?}", name));
    }
    if name.contains(['/', '\\']) {
        return Err(format!(
            "certificate name {:?} must not contain path separators",
            name
        ));
    }
    if name == RESERVED_NAME {
        return Err(format!("certificate name {:?} is reserved", name));
    }
    Ok(())
}

fn config_error(stage: &'static str, path: &Path, message: String) -> TlsForgeError {
    TlsForgeError::ConfigError {
        stage,
        path: path.display().to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::spec::Serial;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[ca_cert]
serial = 1
valid_for_years = 10
[ca_cert.subject]
country = "US"
organization = "Example Org"
common_name = "Example CA"

[certs.server]
serial = 2
valid_for_years = 1
dns_names = ["example.com", "www.example.com"]
[certs.server.subject]
common_name = "example.com"

[certs.client]
serial = "340282366920938463463374607431768211456"
valid_for_years = 2
[certs.client.subject]
common_name = "client"
"#;

    fn stage_of(err: &TlsForgeError) -> &'static str {
        match err {
            TlsForgeError::ConfigError { stage, .. } => stage,
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE, PathBuf::from("tls.toml")).unwrap();

        assert_eq!(config.ca_cert.serial, Serial::from(1));
        assert_eq!(config.ca_cert.valid_for_years, 10);
        assert_eq!(config.ca_cert.subject.country, "US");
        assert_eq!(config.ca_cert.subject.common_name, "Example CA");

        let names: Vec<&str> = config.certs.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["client", "server"]);

        let server = config.leaf("server").unwrap();
        assert_eq!(server.dns_names, vec!["example.com", "www.example.com"]);

        let client = config.leaf("client").unwrap();
        assert!(client.dns_names.is_empty());
        assert_eq!(client.serial.to_bytes_be().len(), 17);
    }

    #[test]
    fn test_parse_camel_case_aliases() {
        let text = r#"
[caCert]
serial = 1
validForYears = 5
[caCert.subject]
commonName = "Camel CA"
organizationalUnit = "Ops"

[certs.web]
serial = 2
validForYears = 1
dnsNames = ["web.example.com"]
[certs.web.subject]
commonName = "web.example.com"
"#;
        let config = Config::parse(text, PathBuf::from("tls.toml")).unwrap();

        assert_eq!(config.ca_cert.valid_for_years, 5);
        assert_eq!(config.ca_cert.subject.common_name, "Camel CA");
        assert_eq!(config.ca_cert.subject.organizational_unit, "Ops");
        assert_eq!(config.leaf("web").unwrap().dns_names, vec!["web.example.com"]);
    }

    #[test]
    fn test_parse_missing_authority() {
        let text = r#"
[certs.server]
serial = 2
valid_for_years = 1
"#;
        let err = Config::parse(text, PathBuf::from("tls.toml")).unwrap_err();
        assert_eq!(stage_of(&err), "validation");
    }

    #[test]
    fn test_parse_without_leaves() {
        let text = r#"
[ca_cert]
serial = 1
valid_for_years = 1
"#;
        let err = Config::parse(text, PathBuf::from("tls.toml")).unwrap_err();
        assert_eq!(stage_of(&err), "validation");
        assert!(err.to_string().contains("no certificates configured"));
    }

    #[test]
    fn test_parse_rejects_unsafe_names() {
        for name in ["\"ca\"", "\"a/b\"", "\"..\""] {
            let text = format!(
                "[ca_cert]\nserial = 1\nvalid_for_years = 1\n[certs.{}]\nserial = 2\nvalid_for_years = 1\n",
                name
            );
            let err = Config::parse(&text, PathBuf::from("tls.toml")).unwrap_err();
            assert_eq!(stage_of(&err), "validation");
        }
    }

    #[test]
    fn test_parse_malformed_toml() {
        let err = Config::parse("[ca_cert\nserial = ", PathBuf::from("tls.toml")).unwrap_err();
        assert_eq!(stage_of(&err), "parsing");
    }

    #[test]
    fn test_parse_bad_serial() {
        let text = r#"
[ca_cert]
serial = "twelve"
valid_for_years = 1
"#;
        let err = Config::parse(text, PathBuf::from("tls.toml")).unwrap_err();
        assert_eq!(stage_of(&err), "parsing");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tls.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.path, path);
        assert_eq!(config.certs.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load(&temp_dir.path().join("missing.toml")).unwrap_err();

        assert_eq!(stage_of(&err), "reading");
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_unknown_leaf() {
        let config = Config::parse(SAMPLE, PathBuf::from("tls.toml")).unwrap();
        assert!(config.leaf("nope").is_err());
    }
}
