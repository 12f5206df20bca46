//! File encryption/decryption operations
//!
//! Thin orchestration over [`crate::envelope`]: read the whole input,
//! obtain the password, seal or open, and write the result atomically.

use crate::envelope::Sealer;
use crate::error::{CryptotoolError, ErrorCategory, ErrorKind, Result};
use crate::passphrase::PassphraseReader;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// Encrypt a file with a password
///
/// Reads plaintext from `input_path`, encrypts it using a password from
/// `passphrase_reader`, and writes the envelope to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    sealer: &Sealer,
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    debug!(path = %input_path.display(), len = plaintext.len(), "read plaintext");
    let passphrase = passphrase_reader.read_passphrase()?;
    let envelope = sealer
        .seal(&plaintext, &passphrase)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_atomic(output_path, &envelope)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(output = %output_path.display(), "encrypted");
    Ok(())
}

/// Decrypt a file with a password
///
/// Reads an envelope from `input_path`, decrypts it using a password from
/// `passphrase_reader`, and writes the plaintext to `output_path`. Nothing is
/// written unless the envelope authenticates.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    sealer: &Sealer,
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let envelope = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    debug!(path = %input_path.display(), len = envelope.len(), "read envelope");
    let passphrase = passphrase_reader.read_passphrase()?;
    let plaintext = sealer
        .open(&envelope, &passphrase)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_atomic(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(output = %output_path.display(), "decrypted");
    Ok(())
}

/// Write `contents` to `path` atomically (tempfile + fsync + rename).
///
/// Either the previous file (if any) or the complete new file exists
/// afterwards, never a partial one. On Unix the result has mode 0o600.
pub fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if path.is_dir() {
        return Err(CryptotoolError::with_kind(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("output path {} is a directory", path.display()),
        ));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // tempfile creates with 0o600 on Unix; the file is removed on drop if
    // we bail out before persisting.
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        CryptotoolError::with_kind_and_source(
            io_category(&e),
            ErrorKind::Io,
            format!("failed to create tempfile in {}", dir.display()),
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| {
        CryptotoolError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        CryptotoolError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        CryptotoolError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                CryptotoolError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }

    temp_file.persist(path).map_err(|e| {
        CryptotoolError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn io_category(err: &io::Error) -> ErrorCategory {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => ErrorCategory::User,
        _ => ErrorCategory::Internal,
    }
}

fn read_error(path: &Path, err: io::Error) -> CryptotoolError {
    CryptotoolError::with_kind_and_source(
        io_category(&err),
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
