//! Golden test vector validation
//!
//! The vectors in testdata/golden-vectors.json were produced by an
//! independent scrypt + AES-GCM implementation using the production cost
//! parameters, so they pin the envelope format byte for byte.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use cryptotool::envelope::{Envelope, Sealer};
use cryptotool::error::ErrorKind;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct GoldenVector {
    plaintext: String,
    ciphertext: String,
    passphrase: String,
    nonce: String,
    salt: String,
    comment: String,
}

struct DecodedVector {
    plaintext: Vec<u8>,
    ciphertext: Vec<u8>,
    passphrase: Vec<u8>,
    nonce: [u8; 12],
    salt: [u8; 16],
}

fn load_golden_vectors() -> Vec<GoldenVector> {
    let json_data = include_str!("../testdata/golden-vectors.json");
    serde_json::from_str(json_data).expect("failed to parse golden vectors")
}

fn decode(vector: &GoldenVector) -> DecodedVector {
    let field = |name: &str, value: &str| {
        BASE64_STANDARD
            .decode(value)
            .unwrap_or_else(|e| panic!("{}: failed to decode {}: {}", vector.comment, name, e))
    };
    DecodedVector {
        plaintext: field("plaintext", &vector.plaintext),
        ciphertext: field("ciphertext", &vector.ciphertext),
        passphrase: field("passphrase", &vector.passphrase),
        nonce: field("nonce", &vector.nonce)
            .try_into()
            .expect("nonce must be 12 bytes"),
        salt: field("salt", &vector.salt)
            .try_into()
            .expect("salt must be 16 bytes"),
    }
}

#[test]
fn test_golden_vectors_seal() {
    let sealer = Sealer::with_default_params().unwrap();

    for vector in load_golden_vectors() {
        let v = decode(&vector);
        let sealed = sealer
            .seal_with_salt_and_nonce(&v.plaintext, &v.passphrase, &v.salt, &v.nonce)
            .unwrap();
        assert_eq!(
            sealed, v.ciphertext,
            "ciphertext mismatch for vector: {}",
            vector.comment
        );
    }
}

#[test]
fn test_golden_vectors_open() {
    let sealer = Sealer::with_default_params().unwrap();

    for vector in load_golden_vectors() {
        let v = decode(&vector);

        let view = Envelope::parse(&v.ciphertext).unwrap();
        assert_eq!(view.salt(), &v.salt, "{}", vector.comment);
        assert_eq!(view.nonce(), &v.nonce, "{}", vector.comment);

        let opened = sealer.open(&v.ciphertext, &v.passphrase).unwrap();
        assert_eq!(
            opened, v.plaintext,
            "plaintext mismatch for vector: {}",
            vector.comment
        );
    }
}

#[test]
fn test_golden_vectors_reject_wrong_passphrase() {
    let sealer = Sealer::with_default_params().unwrap();
    let vectors = load_golden_vectors();

    // One vector is enough; each open costs a full-strength scrypt run.
    let v = decode(&vectors[1]);
    let mut wrong = v.passphrase.clone();
    wrong.push(b'!');

    let err = sealer.open(&v.ciphertext, &wrong).unwrap_err();
    assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
}
