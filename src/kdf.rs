//! Password-based key derivation using scrypt
//!
//! Cost parameters are fixed at construction of a [`KeyDeriver`] rather than
//! stored in the envelope, so encrypt and decrypt must agree on them out of
//! band. Production code always uses [`KdfParams::DEFAULT`].

use std::time::Instant;

use scrypt::{Params, scrypt};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{CryptotoolError, ErrorCategory, ErrorKind, Result};

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// scrypt cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// log2 of the CPU/memory cost N
    pub log_n: u8,
    /// Block size
    pub r: u32,
    /// Parallelization
    pub p: u32,
}

impl KdfParams {
    /// N = 32768, r = 8, p = 1. Roughly 32 MiB of memory per derivation.
    pub const DEFAULT: KdfParams = KdfParams {
        log_n: 15,
        r: 8,
        p: 1,
    };
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Derives fixed-length keys from a password and salt.
///
/// Immutable after construction; safe to share between threads.
/// Build one with `KeyDeriver::new(KdfParams::DEFAULT)`.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    params: Params,
    kdf_params: KdfParams,
}

impl KeyDeriver {
    /// Validates `kdf_params` and builds a deriver producing [`KEY_LEN`]-byte keys.
    pub fn new(kdf_params: KdfParams) -> Result<Self> {
        let params = Params::new(kdf_params.log_n, kdf_params.r, kdf_params.p, KEY_LEN)
            .map_err(|e| {
                CryptotoolError::with_kind(
                    ErrorCategory::Internal,
                    ErrorKind::KeyDerivation,
                    format!("invalid scrypt parameters {:?}: {}", kdf_params, e),
                )
            })?;
        Ok(Self { params, kdf_params })
    }

    pub fn params(&self) -> KdfParams {
        self.kdf_params
    }

    /// Derive a key from `password` and `salt`.
    ///
    /// Deterministic: the same inputs under the same parameters always yield
    /// the same key. Blocks for as long as scrypt takes; there is no
    /// cancellation point.
    pub fn derive_key(
        &self,
        password: &[u8],
        salt: &[u8; SALT_LEN],
    ) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let started = Instant::now();
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        scrypt(password, salt, &self.params, &mut key[..]).map_err(|e| {
            CryptotoolError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::KeyDerivation,
                format!("scrypt key derivation failed: {}", e),
            )
        })?;
        debug!(
            log_n = self.kdf_params.log_n,
            r = self.kdf_params.r,
            p = self.kdf_params.p,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "derived key"
        );
        Ok(key)
    }
}

/// Derive a key with the default cost parameters.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    KeyDeriver::new(KdfParams::DEFAULT)?.derive_key(password, salt)
}
