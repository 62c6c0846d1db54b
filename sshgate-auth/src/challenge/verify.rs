//! Response verification against the issued challenge.

use sha2::{Digest, Sha256};
use signature::{DigestVerifier as _, Verifier as _};

use crate::keys::{KeyAlgorithm, ParsedKey};

use super::error::VerifyError;

/// Check a claimed response against the original challenge text.
///
/// The response is interpreted as a digital signature over
/// `challenge_plaintext` in the scheme native to the key:
///
/// - RSA: RSASSA-PKCS#1 v1.5 with SHA-256 (the scheme legacy client
///   signers produce)
/// - Ed25519: strict Ed25519 over the raw text
/// - ECDSA P-256: ECDSA/SHA-256, DER or fixed-width encoding
/// - DSA: DER-encoded (r, s) over the SHA-256 digest
///
/// Returns `Ok(true)` only on a cryptographic match. Malformed
/// signatures, wrong keys, and algorithm mismatches all return
/// `Ok(false)`; [`VerifyError`] is reserved for internal faults. Pure
/// function - consuming the challenge and promoting the session are the
/// caller's job.
#[must_use = "verification result must be checked"]
pub fn verify(
    challenge_plaintext: &[u8],
    response: &[u8],
    key: &ParsedKey,
) -> Result<bool, VerifyError> {
    match key.algorithm() {
        KeyAlgorithm::Rsa => verify_rsa(challenge_plaintext, response, key),
        KeyAlgorithm::Ed25519 => Ok(verify_ed25519(challenge_plaintext, response, key)),
        KeyAlgorithm::EcdsaP256 => Ok(verify_p256(challenge_plaintext, response, key)),
        KeyAlgorithm::Dsa => Ok(verify_dsa(challenge_plaintext, response, key)),
    }
}

fn verify_rsa(message: &[u8], response: &[u8], key: &ParsedKey) -> Result<bool, VerifyError> {
    // Parsing guaranteed convertibility for RSA records; failing here is
    // a fault in the verifier, not a bad response.
    let public_key = key.rsa().map_err(|_| VerifyError::KeyRejected)?;
    let digest = Sha256::digest(message);
    Ok(public_key
        .verify(rsa::Pkcs1v15Sign::new::<Sha256>(), &digest, response)
        .is_ok())
}

fn verify_ed25519(message: &[u8], response: &[u8], key: &ParsedKey) -> bool {
    let Ok(verifying_key) = key.ed25519() else {
        return false;
    };
    let Ok(signature) = ed25519_dalek::Signature::from_slice(response) else {
        return false;
    };
    // verify_strict rejects weak/small-order keys
    verifying_key.verify_strict(message, &signature).is_ok()
}

fn verify_p256(message: &[u8], response: &[u8], key: &ParsedKey) -> bool {
    let Ok(verifying_key) = key.ecdsa_p256() else {
        return false;
    };
    let Ok(signature) = p256::ecdsa::Signature::from_der(response)
        .or_else(|_| p256::ecdsa::Signature::from_slice(response))
    else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}

fn verify_dsa(message: &[u8], response: &[u8], key: &ParsedKey) -> bool {
    let Ok(verifying_key) = key.dsa() else {
        // Structurally valid ssh-dss records can still carry an unusable
        // parameter set; that is a mismatch, not an internal fault.
        return false;
    };
    let Ok(signature) = dsa::Signature::try_from(response) else {
        return false;
    };
    verifying_key
        .verify_digest(Sha256::new_with_prefix(message), &signature)
        .is_ok()
}
