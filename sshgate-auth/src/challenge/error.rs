//! Challenge cipher and verifier error types.

use crate::keys::KeyAlgorithm;

/// Errors that can occur while sealing a challenge under a public key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CipherError {
    /// The key algorithm does not define public-key encryption; the
    /// caller must switch to the signature-challenge flow.
    #[error("{0} keys do not support challenge encryption")]
    NotApplicable(KeyAlgorithm),

    /// The parsed key could not be used by the cipher backend.
    #[error("invalid encryption key")]
    InvalidKey,

    /// The cipher backend rejected the operation.
    #[error("challenge encryption failed")]
    EncryptionFailed,
}

/// Internal verifier fault.
///
/// Routine verification failures (bad signature, malformed response,
/// algorithm mismatch) are reported as `Ok(false)`, never as an error;
/// this type only surfaces faults in the verifier itself, such as key
/// material that passed parsing but cannot be reconstructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum VerifyError {
    /// The parsed key could not be rebuilt for verification.
    #[error("verification key could not be reconstructed")]
    KeyRejected,
}
