//! Challenge text generation.

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Number of random bytes behind each challenge.
const CHALLENGE_BYTES: usize = 32;

/// The one-time value a client must prove possession of a key over.
///
/// 32 bytes of OS entropy, hex-encoded to a fixed 64-character string.
/// The text form is what crosses the wire (directly for signature-mode
/// keys, sealed for RSA) and what the client signs, so the proof
/// operations work over [`ChallengeText::as_bytes`].
#[derive(Debug, Clone, Eq)]
pub struct ChallengeText(String);

impl ChallengeText {
    /// Generate a fresh challenge from the OS random source.
    ///
    /// `OsRng` either returns cryptographic entropy or aborts; there is
    /// no degraded fallback source.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; CHALLENGE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// The fixed-length hex text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bytes the client signs (the ASCII of the hex text).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl PartialEq for ChallengeText {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time comparison to prevent timing attacks
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::fmt::Display for ChallengeText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
