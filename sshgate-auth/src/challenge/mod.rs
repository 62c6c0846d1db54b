//! One-time challenge material and the proof operations over it.
//!
//! A challenge is 32 bytes of OS entropy rendered as a fixed-length hex
//! string. How the client proves possession depends on the key algorithm:
//!
//! - RSA: the text is sealed with RSA-OAEP/SHA-256 ([`encrypt`]); the
//!   client decrypts it and signs it with RSASSA-PKCS#1 v1.5/SHA-256.
//! - Ed25519 / ECDSA P-256 / DSA: encryption is not a defined operation
//!   for these schemes, so [`encrypt`] refuses with
//!   [`CipherError::NotApplicable`] and the text is delivered in the
//!   clear for the client to sign.
//!
//! [`verify`] checks the returned signature for every algorithm; there is
//! no placeholder path that accepts unverified responses.

mod cipher;
mod error;
mod secret;
mod verify;

pub use cipher::encrypt;
pub use error::{CipherError, VerifyError};
pub use secret::ChallengeText;
pub use verify::verify;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;
    use crate::testutil;

    #[test]
    fn rsa_seal_decrypt_sign_verify_roundtrip() {
        let pair = testutil::generate_rsa(2048);
        let key = keys::parse(pair.record()).unwrap();
        let text = ChallengeText::generate();

        let ciphertext = encrypt(text.as_bytes(), &key).unwrap();
        assert_ne!(ciphertext, text.as_bytes());

        // The key holder recovers the exact challenge text and signs it.
        let recovered = pair.decrypt(&ciphertext);
        assert_eq!(recovered, text.as_bytes());

        let signature = pair.sign(&recovered);
        assert_eq!(verify(text.as_bytes(), &signature, &key), Ok(true));
    }

    #[test]
    fn ed25519_sign_verify_roundtrip() {
        let pair = testutil::generate_ed25519();
        let key = keys::parse(pair.record()).unwrap();
        let text = ChallengeText::generate();

        let signature = pair.sign(text.as_bytes());
        assert_eq!(verify(text.as_bytes(), &signature, &key), Ok(true));
    }

    #[test]
    fn p256_sign_verify_roundtrip() {
        let pair = testutil::generate_p256();
        let key = keys::parse(pair.record()).unwrap();
        let text = ChallengeText::generate();

        let signature = pair.sign(text.as_bytes());
        assert_eq!(verify(text.as_bytes(), &signature, &key), Ok(true));
    }

    #[test]
    fn single_bit_flip_rejected_for_every_algorithm() {
        let pairs = [
            testutil::generate_rsa(2048),
            testutil::generate_ed25519(),
            testutil::generate_p256(),
        ];

        for pair in &pairs {
            let key = keys::parse(pair.record()).unwrap();
            let text = ChallengeText::generate();
            let mut signature = pair.sign(text.as_bytes());

            signature[0] ^= 0x01;
            assert_eq!(
                verify(text.as_bytes(), &signature, &key),
                Ok(false),
                "mutated {} signature must not verify",
                key.algorithm()
            );
        }
    }

    #[test]
    fn signature_over_different_challenge_rejected() {
        let pair = testutil::generate_ed25519();
        let key = keys::parse(pair.record()).unwrap();

        let issued = ChallengeText::generate();
        let other = ChallengeText::generate();
        let signature = pair.sign(other.as_bytes());

        assert_eq!(verify(issued.as_bytes(), &signature, &key), Ok(false));
    }

    #[test]
    fn signature_from_wrong_key_rejected() {
        let registered = testutil::generate_ed25519();
        let imposter = testutil::generate_ed25519();
        let key = keys::parse(registered.record()).unwrap();
        let text = ChallengeText::generate();

        let signature = imposter.sign(text.as_bytes());
        assert_eq!(verify(text.as_bytes(), &signature, &key), Ok(false));
    }

    #[test]
    fn cross_algorithm_response_rejected() {
        // An RSA signature presented against an Ed25519 key is a routine
        // mismatch, not an internal fault.
        let rsa = testutil::generate_rsa(2048);
        let ed = testutil::generate_ed25519();
        let key = keys::parse(ed.record()).unwrap();
        let text = ChallengeText::generate();

        let signature = rsa.sign(text.as_bytes());
        assert_eq!(verify(text.as_bytes(), &signature, &key), Ok(false));
    }
}
