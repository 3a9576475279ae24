//! Atomic writing of key/certificate pairs.
//!
//! Both files are staged as temporary files next to their targets and only
//! renamed into place once both are fully written. A failure leaves no
//! half-written pair behind.

use crate::cert::codec::IssuedMaterial;
use crate::error::{Result, TlsForgeError};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Permission bits for private key files.
pub const KEY_FILE_MODE: u32 = 0o600;

/// Permission bits for certificate files.
pub const CERT_FILE_MODE: u32 = 0o644;

/// Write a private key and certificate to their target paths.
///
/// The certificate is renamed into place first and the key second. If the key
/// cannot be put in place, the new certificate is removed again and any key
/// already at `key_path` is left untouched. A certificate previously at
/// `cert_path` is not restored in that case.
///
/// # Arguments
///
/// * `material` - PEM key and certificate produced by issuance
/// * `key_path` - Destination of the `PRIVATE KEY` block (mode 0600)
/// * `cert_path` - Destination of the `CERTIFICATE` block (mode 0644)
///
/// # Example
///
/// ```rust,no_run
/// use tlsforge::cert::ca::create_authority;
/// use tlsforge::cert::spec::AuthoritySpec;
/// use tlsforge::cert::subject::Subject;
/// use tlsforge::clock::SystemClock;
/// use tlsforge::storage::material::write_material;
/// use std::path::Path;
///
/// # fn example() -> tlsforge::error::Result<()> {
/// let spec = AuthoritySpec::new(1, 10, Subject::with_common_name("My Root CA"));
/// let material = create_authority(&spec, &SystemClock)?;
/// write_material(&material, Path::new("ca.key"), Path::new("ca.crt"))?;
/// # Ok(())
/// # }
/// ```
pub fn write_material(material: &IssuedMaterial, key_path: &Path, cert_path: &Path) -> Result<()> {
    if key_path == cert_path {
        return Err(TlsForgeError::StorageError(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "key and certificate cannot share the path {}",
                key_path.display()
            ),
        )));
    }

    let staged_key = stage(key_path, material.private_key.as_bytes(), KEY_FILE_MODE)?;
    let staged_cert = stage(cert_path, material.certificate.as_bytes(), CERT_FILE_MODE)?;

    staged_cert.persist(cert_path).map_err(|e| e.error)?;
    if let Err(e) = staged_key.persist(key_path) {
        // A certificate without its key is useless; take it back out.
        if let Err(remove_err) = fs::remove_file(cert_path) {
            log::warn!(
                "Failed to remove {} after incomplete write: {}",
                cert_path.display(),
                remove_err
            );
        }
        return Err(e.error.into());
    }

    log::debug!(
        "Wrote {} and {}",
        key_path.display(),
        cert_path.display()
    );
    Ok(())
}

/// Read PEM material from disk.
pub fn read_material(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        TlsForgeError::StorageError(std::io::Error::new(
            e.kind(),
            format!("Failed to read {}: {}", path.display(), e),
        ))
    })
}

fn stage(target: &Path, contents: &[u8], mode: u32) -> Result<NamedTempFile> {
    let directory = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    set_mode(&file, mode)?;

    Ok(file)
}

#[cfg(unix)]
fn set_mode(file: &NamedTempFile, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.as_file()
        .set_permissions(fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_file: &NamedTempFile, _mode: u32) -> Result<()> {
    Ok(())
}
