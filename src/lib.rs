//! cryptotool - Password-based file encryption using scrypt and AES-256-GCM

#![forbid(unsafe_code)]

pub mod envelope;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod passphrase;
