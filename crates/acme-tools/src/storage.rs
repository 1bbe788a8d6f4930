//! File storage for account files, certificate keys and chains
//!
//! Secrets (account credentials, private keys) are written with mode 0600
//! on Unix.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use acme_tools_config::expand_home;

use crate::challenge::IssuedCertificate;
use crate::error::StorageError;

/// Read a file, expanding `~`
pub fn read_file(path: impl AsRef<Path>) -> Result<String, StorageError> {
    let path = expand_home(path);
    fs::read_to_string(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound {
            path: path.display().to_string(),
        },
        _ => StorageError::Io(e),
    })
}

/// Write a file readable only by its owner
///
/// `~` is expanded. With `create_parents`, missing parent directories are
/// created first. The file is created with mode 0600 and an existing file
/// is restricted before its contents are replaced.
pub fn write_private_file(
    path: impl AsRef<Path>,
    contents: &str,
    create_parents: bool,
) -> Result<PathBuf, StorageError> {
    let path = prepare_path(path, create_parents)?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(false);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.set_len(0)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;

    debug!(path = %path.display(), bytes = contents.len(), "Private file written");
    Ok(path)
}

/// Write a file, expanding `~`
pub fn write_file(
    path: impl AsRef<Path>,
    contents: &str,
    create_parents: bool,
) -> Result<PathBuf, StorageError> {
    let path = prepare_path(path, create_parents)?;
    fs::write(&path, contents)?;
    debug!(path = %path.display(), bytes = contents.len(), "File written");
    Ok(path)
}

fn prepare_path(path: impl AsRef<Path>, create_parents: bool) -> Result<PathBuf, StorageError> {
    let path = expand_home(path);

    if create_parents {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
    }

    Ok(path)
}

/// Fail with [`StorageError::AlreadyExists`] if the path exists
pub fn ensure_absent(path: impl AsRef<Path>) -> Result<(), StorageError> {
    let path = expand_home(path);
    if path.exists() {
        return Err(StorageError::AlreadyExists {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// File stem used for a domain's key and certificate
///
/// A wildcard prefix becomes `_wildcard.` so the name stays shell-friendly.
pub fn certificate_file_stem(domain: &str) -> String {
    match domain.strip_prefix("*.") {
        Some(base) => format!("_wildcard.{}", base),
        None => domain.to_string(),
    }
}

/// Paths of the key and certificate chain files for a domain
pub fn certificate_paths(out_dir: &Path, domain: &str) -> (PathBuf, PathBuf) {
    let stem = certificate_file_stem(domain);
    (
        out_dir.join(format!("{}.key", stem)),
        out_dir.join(format!("{}.crt", stem)),
    )
}

/// Save an issued certificate under `out_dir`
///
/// Returns the key and certificate paths.
pub fn save_certificate(
    out_dir: &Path,
    domain: &str,
    issued: &IssuedCertificate,
) -> Result<(PathBuf, PathBuf), StorageError> {
    let out_dir = expand_home(out_dir);
    fs::create_dir_all(&out_dir)?;

    let (key_path, cert_path) = certificate_paths(&out_dir, domain);
    let key_path = write_private_file(&key_path, &issued.private_key_pem, false)?;
    let cert_path = write_file(&cert_path, &issued.certificate_chain_pem, false)?;

    debug!(
        domain = %domain,
        key = %key_path.display(),
        cert = %cert_path.display(),
        "Certificate saved"
    );
    Ok((key_path, cert_path))
}
