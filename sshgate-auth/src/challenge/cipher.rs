//! Challenge sealing under a registered public key.

use rand::rngs::OsRng;
use rsa::Oaep;
use sha2::Sha256;

use crate::keys::{KeyAlgorithm, ParsedKey};

use super::error::CipherError;

/// Seal a challenge so only the private-key holder can recover it.
///
/// RSA keys get RSA-OAEP with SHA-256. The output is raw ciphertext;
/// base64 belongs to the transport boundary, not here. A 64-byte
/// challenge needs a modulus of at least 2048 bits under OAEP/SHA-256;
/// smaller keys fail with `EncryptionFailed`.
///
/// Signature-only algorithms (Ed25519, ECDSA P-256, DSA) return
/// [`CipherError::NotApplicable`] so the caller branches to the
/// cleartext signature flow. Failures are never papered over by
/// returning the plaintext.
///
/// # Errors
///
/// - `CipherError::NotApplicable` - key algorithm has no encryption
///   operation
/// - `CipherError::InvalidKey` - key material rejected by the backend
/// - `CipherError::EncryptionFailed` - backend refused the operation
pub fn encrypt(plaintext: &[u8], key: &ParsedKey) -> Result<Vec<u8>, CipherError> {
    match key.algorithm() {
        KeyAlgorithm::Rsa => {
            let public_key = key.rsa().map_err(|_| CipherError::InvalidKey)?;
            public_key
                .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
                .map_err(|_| CipherError::EncryptionFailed)
        }
        algorithm @ (KeyAlgorithm::Ed25519 | KeyAlgorithm::EcdsaP256 | KeyAlgorithm::Dsa) => {
            Err(CipherError::NotApplicable(algorithm))
        }
    }
}
