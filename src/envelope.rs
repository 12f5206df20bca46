//! Authenticated envelope using scrypt + AES-256-GCM
//!
//! The binary format is:
//! - salt: 16 bytes
//! - nonce: 12 bytes
//! - sealed: variable length (ciphertext followed by the 16-byte GCM tag)
//!
//! There is no version marker, length field or associated data. Any
//! modification of any byte is caught by tag verification.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::TryRngCore;
use rand::rngs::OsRng;
use std::error::Error as StdError;
use tracing::debug;

use crate::error::{CryptotoolError, ErrorCategory, ErrorKind, Result};
use crate::kdf::{KdfParams, KeyDeriver, SALT_LEN};

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Length of the cleartext header preceding the sealed payload
pub const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;

const AUTH_FAILED_MSG: &str = "authentication failed: wrong password or corrupted data";

/// Borrowed view of an envelope split into its three regions.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    salt: &'a [u8; SALT_LEN],
    nonce: &'a [u8; NONCE_LEN],
    sealed: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Split `bytes` into salt, nonce and sealed payload.
    ///
    /// Only the header length is checked here; the payload is not
    /// authenticated until it is opened.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let too_short = || {
            CryptotoolError::with_kind(
                ErrorCategory::User,
                ErrorKind::MalformedEnvelope,
                format!(
                    "encrypted data is too short: expected at least {} bytes, got {}",
                    HEADER_LEN,
                    bytes.len()
                ),
            )
        };
        let (salt, rest) = bytes.split_first_chunk::<SALT_LEN>().ok_or_else(too_short)?;
        let (nonce, sealed) = rest.split_first_chunk::<NONCE_LEN>().ok_or_else(too_short)?;
        Ok(Self {
            salt,
            nonce,
            sealed,
        })
    }

    pub fn salt(&self) -> &'a [u8; SALT_LEN] {
        self.salt
    }

    pub fn nonce(&self) -> &'a [u8; NONCE_LEN] {
        self.nonce
    }

    /// Ciphertext with the authentication tag appended.
    pub fn sealed(&self) -> &'a [u8] {
        self.sealed
    }
}

/// Source of salt and nonce bytes.
///
/// Implementations must be cryptographically secure and must report
/// failure instead of degrading to weaker output.
pub trait RandomSource {
    type Error: StdError + Send + Sync + 'static;

    fn try_fill(&self, dest: &mut [u8]) -> std::result::Result<(), Self::Error>;
}

impl RandomSource for OsRng {
    type Error = <OsRng as TryRngCore>::Error;

    fn try_fill(&self, dest: &mut [u8]) -> std::result::Result<(), Self::Error> {
        OsRng.try_fill_bytes(dest)
    }
}

/// Seals and opens envelopes with a fixed key derivation configuration.
#[derive(Debug, Clone)]
pub struct Sealer<R = OsRng> {
    deriver: KeyDeriver,
    rng: R,
}

impl Sealer<OsRng> {
    pub fn new(deriver: KeyDeriver) -> Self {
        Self::with_random_source(deriver, OsRng)
    }

    /// A sealer using the production scrypt cost.
    pub fn with_default_params() -> Result<Self> {
        Ok(Self::new(KeyDeriver::new(KdfParams::DEFAULT)?))
    }
}

impl<R: RandomSource> Sealer<R> {
    pub fn with_random_source(deriver: KeyDeriver, rng: R) -> Self {
        Self { deriver, rng }
    }

    /// Encrypt `plaintext` under `password` using a fresh random salt and nonce.
    ///
    /// Returns `salt(16) || nonce(12) || ciphertext || tag(16)`.
    pub fn seal(&self, plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        self.fill_random(&mut salt, "salt")?;

        let mut nonce = [0u8; NONCE_LEN];
        self.fill_random(&mut nonce, "nonce")?;

        self.seal_with_salt_and_nonce(plaintext, password, &salt, &nonce)
    }

    /// Encrypt with a caller-provided salt and nonce.
    ///
    /// This function is ONLY for golden vectors and tests that need
    /// deterministic output. Reusing a (salt, nonce) pair under the same
    /// password destroys confidentiality; always use [`Sealer::seal`] otherwise.
    pub fn seal_with_salt_and_nonce(
        &self,
        plaintext: &[u8],
        password: &[u8],
        salt: &[u8; SALT_LEN],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>> {
        let key = self.deriver.derive_key(password, salt)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));

        let sealed = cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|e| {
                CryptotoolError::with_kind(
                    ErrorCategory::Internal,
                    ErrorKind::CipherFailure,
                    format!("encryption failed: {}", e),
                )
            })?;

        let mut output = Vec::with_capacity(HEADER_LEN + sealed.len());
        output.extend_from_slice(salt);
        output.extend_from_slice(nonce);
        output.extend_from_slice(&sealed);

        debug!(
            plaintext_len = plaintext.len(),
            envelope_len = output.len(),
            "sealed envelope"
        );
        Ok(output)
    }

    /// Decrypt an envelope produced by [`Sealer::seal`].
    ///
    /// Either the full authenticated plaintext is returned or an error; no
    /// bytes are released when the tag fails to verify.
    pub fn open(&self, envelope: &[u8], password: &[u8]) -> Result<Vec<u8>> {
        let envelope = Envelope::parse(envelope)?;

        let key = self.deriver.derive_key(password, envelope.salt())?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));

        let plaintext = cipher
            .decrypt(Nonce::from_slice(envelope.nonce()), envelope.sealed())
            .map_err(|_| {
                CryptotoolError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::AuthenticationFailed,
                    AUTH_FAILED_MSG,
                )
            })?;

        debug!(plaintext_len = plaintext.len(), "opened envelope");
        Ok(plaintext)
    }

    // No fallback to a weaker source if the random source fails.
    fn fill_random(&self, buf: &mut [u8], what: &str) -> Result<()> {
        self.rng.try_fill(buf).map_err(|e| {
            CryptotoolError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::RandomSource,
                format!("failed to obtain random {}: {}", what, e),
                e,
            )
        })
    }
}

/// Seal with the production scrypt cost.
pub fn seal(plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    Sealer::with_default_params()?.seal(plaintext, password)
}

/// Open with the production scrypt cost.
pub fn open(envelope: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    Sealer::with_default_params()?.open(envelope, password)
}
