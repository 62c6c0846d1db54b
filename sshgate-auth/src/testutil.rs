//! Shared test helpers for exercising real key material.
//!
//! Generates keypairs, encodes their OpenSSH public records, and produces
//! the client-side halves of the protocol (challenge decryption, response
//! signing) so tests can drive complete flows without fixtures. Gated
//! behind the `testutil` feature to keep it out of production builds.
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! sshgate-auth = { path = "../sshgate-auth", features = ["testutil"] }
//! ```

use base64::prelude::*;
use ed25519_dalek::Signer as _;
use p256::ecdsa::signature::Signer as _;
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pkcs1v15Sign};
use sha2::{Digest, Sha256};

/// A generated keypair with its registered public record and the
/// client-side operations a key holder would perform.
pub struct TestKeypair {
    record: String,
    signer: TestSigner,
}

enum TestSigner {
    Rsa(rsa::RsaPrivateKey),
    Ed25519(ed25519_dalek::SigningKey),
    P256(p256::ecdsa::SigningKey),
}

impl TestKeypair {
    /// The OpenSSH public-key record as the directory would store it.
    #[must_use]
    pub fn record(&self) -> &str {
        &self.record
    }

    /// Sign a challenge the way the matching client signer does:
    /// RSASSA-PKCS#1 v1.5/SHA-256 for RSA, plain Ed25519, DER-encoded
    /// ECDSA/SHA-256 for P-256.
    ///
    /// # Panics
    ///
    /// Panics on signing failure; test keys always sign.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.signer {
            TestSigner::Rsa(key) => key
                .sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(message))
                .expect("RSA signing should succeed for test keys"),
            TestSigner::Ed25519(key) => key.sign(message).to_bytes().to_vec(),
            TestSigner::P256(key) => {
                let signature: p256::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            }
        }
    }

    /// Decrypt an RSA-OAEP/SHA-256 sealed challenge.
    ///
    /// # Panics
    ///
    /// Panics if this is not an RSA keypair or decryption fails.
    #[must_use]
    pub fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8> {
        match &self.signer {
            TestSigner::Rsa(key) => key
                .decrypt(Oaep::new::<Sha256>(), ciphertext)
                .expect("OAEP decryption should succeed for test keys"),
            _ => panic!("decrypt is only defined for RSA keypairs"),
        }
    }
}

/// Generate an RSA keypair and its `ssh-rsa` record.
#[must_use]
pub fn generate_rsa(bits: usize) -> TestKeypair {
    let key = rsa::RsaPrivateKey::new(&mut OsRng, bits).expect("RSA key generation");
    let public = key.to_public_key();

    let mut blob = Vec::new();
    wire_string(&mut blob, b"ssh-rsa");
    wire_mpint(&mut blob, &public.e().to_bytes_be());
    wire_mpint(&mut blob, &public.n().to_bytes_be());

    TestKeypair {
        record: record_from_blob("ssh-rsa", &blob),
        signer: TestSigner::Rsa(key),
    }
}

/// Generate an Ed25519 keypair and its `ssh-ed25519` record.
#[must_use]
pub fn generate_ed25519() -> TestKeypair {
    let key = ed25519_dalek::SigningKey::generate(&mut OsRng);

    let mut blob = Vec::new();
    wire_string(&mut blob, b"ssh-ed25519");
    wire_string(&mut blob, key.verifying_key().as_bytes());

    TestKeypair {
        record: record_from_blob("ssh-ed25519", &blob),
        signer: TestSigner::Ed25519(key),
    }
}

/// Generate an ECDSA P-256 keypair and its `ecdsa-sha2-nistp256` record.
#[must_use]
pub fn generate_p256() -> TestKeypair {
    let key = p256::ecdsa::SigningKey::random(&mut OsRng);
    let point = key.verifying_key().to_encoded_point(false);

    let mut blob = Vec::new();
    wire_string(&mut blob, b"ecdsa-sha2-nistp256");
    wire_string(&mut blob, b"nistp256");
    wire_string(&mut blob, point.as_bytes());

    TestKeypair {
        record: record_from_blob("ecdsa-sha2-nistp256", &blob),
        signer: TestSigner::P256(key),
    }
}

/// A structurally valid `ssh-dss` record with fabricated components.
///
/// The mpints have realistic sizes (1024-bit p/g/y, 160-bit q) but are
/// not a real parameter set, so it parses but never verifies anything.
#[must_use]
pub fn toy_dsa_record() -> String {
    let mut blob = Vec::new();
    wire_string(&mut blob, b"ssh-dss");
    wire_mpint(&mut blob, &[0x5b; 128]);
    wire_mpint(&mut blob, &[0x5c; 20]);
    wire_mpint(&mut blob, &[0x5d; 128]);
    wire_mpint(&mut blob, &[0x5e; 128]);
    record_from_blob("ssh-dss", &blob)
}

/// Append an SSH wire-format string (4-byte big-endian length + bytes).
pub fn wire_string(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}

/// Append an SSH wire-format mpint (positive, zero-padded if the high
/// bit of the leading byte is set).
pub fn wire_mpint(out: &mut Vec<u8>, magnitude: &[u8]) {
    let magnitude: Vec<u8> = magnitude
        .iter()
        .copied()
        .skip_while(|&b| b == 0)
        .collect();
    if magnitude.first().is_some_and(|&b| b & 0x80 != 0) {
        out.extend_from_slice(&((magnitude.len() + 1) as u32).to_be_bytes());
        out.push(0x00);
    } else {
        out.extend_from_slice(&(magnitude.len() as u32).to_be_bytes());
    }
    out.extend_from_slice(&magnitude);
}

/// Assemble a full record line from a tag and wire blob.
#[must_use]
pub fn record_from_blob(tag: &str, blob: &[u8]) -> String {
    format!("{tag} {} sshgate-test", BASE64_STANDARD.encode(blob))
}
