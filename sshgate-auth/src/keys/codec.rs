//! Parsing of OpenSSH public-key records into usable key objects.

use num_bigint_dig::BigUint;
use ssh_key::public::KeyData;

/// Errors that can occur while parsing a public-key record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum KeyError {
    /// The record is not a well-formed, supported OpenSSH public key.
    #[error("malformed public-key record")]
    Malformed,

    /// The record is structurally valid but its key material cannot be
    /// turned into a usable key object.
    #[error("unsupported public-key encoding")]
    UnsupportedEncoding,
}

/// The closed set of key algorithms sshgate accepts.
///
/// Matched exhaustively everywhere a flow branches on key type; a new
/// algorithm is a new variant plus its cipher/verifier arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// `ssh-rsa`
    Rsa,
    /// `ssh-ed25519`
    Ed25519,
    /// `ecdsa-sha2-nistp256`
    EcdsaP256,
    /// `ssh-dss`
    Dsa,
}

impl KeyAlgorithm {
    /// The canonical record prefix token for this algorithm.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Rsa => "ssh-rsa",
            Self::Ed25519 => "ssh-ed25519",
            Self::EcdsaP256 => "ecdsa-sha2-nistp256",
            Self::Dsa => "ssh-dss",
        }
    }

    /// Whether challenges for this key type are delivered encrypted.
    ///
    /// Only RSA defines a public-key encryption operation; the other
    /// algorithms are signature-only and prove possession by signing a
    /// cleartext challenge.
    #[must_use]
    pub fn supports_encryption(self) -> bool {
        matches!(self, Self::Rsa)
    }

    fn from_ssh(algorithm: &ssh_key::Algorithm) -> Option<Self> {
        match algorithm {
            ssh_key::Algorithm::Rsa { .. } => Some(Self::Rsa),
            ssh_key::Algorithm::Ed25519 => Some(Self::Ed25519),
            ssh_key::Algorithm::Ecdsa {
                curve: ssh_key::EcdsaCurve::NistP256,
            } => Some(Self::EcdsaP256),
            ssh_key::Algorithm::Dsa => Some(Self::Dsa),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A decoded public-key record.
///
/// Derived on demand from the stored text and scoped to a single
/// request; it is never persisted. The original record text is kept so
/// orchestration can detect a directory record that changed between
/// challenge issuance and verification.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedKey {
    algorithm: KeyAlgorithm,
    data: KeyData,
    record: String,
}

impl ParsedKey {
    /// The algorithm this key uses.
    #[must_use]
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// The exact record text this key was parsed from.
    #[must_use]
    pub fn raw_record(&self) -> &str {
        &self.record
    }

    /// Build the RSA public key object for encryption/verification.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::UnsupportedEncoding` if this is not an RSA key
    /// or the embedded (e, n) pair is rejected by the RSA backend.
    pub fn rsa(&self) -> Result<rsa::RsaPublicKey, KeyError> {
        let rsa_data = self.data.rsa().ok_or(KeyError::UnsupportedEncoding)?;
        let e = mpint_to_uint(&rsa_data.e)?;
        let n = mpint_to_uint(&rsa_data.n)?;
        rsa::RsaPublicKey::new(n, e).map_err(|_| KeyError::UnsupportedEncoding)
    }

    /// Build the Ed25519 verifying key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::UnsupportedEncoding` if this is not an Ed25519
    /// key or the 32 bytes do not decode to a curve point.
    pub fn ed25519(&self) -> Result<ed25519_dalek::VerifyingKey, KeyError> {
        let data = self.data.ed25519().ok_or(KeyError::UnsupportedEncoding)?;
        ed25519_dalek::VerifyingKey::from_bytes(&data.0)
            .map_err(|_| KeyError::UnsupportedEncoding)
    }

    /// Build the ECDSA P-256 verifying key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::UnsupportedEncoding` if this is not a P-256 key
    /// or the SEC1 point is invalid.
    pub fn ecdsa_p256(&self) -> Result<p256::ecdsa::VerifyingKey, KeyError> {
        let data = self.data.ecdsa().ok_or(KeyError::UnsupportedEncoding)?;
        p256::ecdsa::VerifyingKey::from_sec1_bytes(data.as_sec1_bytes())
            .map_err(|_| KeyError::UnsupportedEncoding)
    }

    /// Build the DSA verifying key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::UnsupportedEncoding` if this is not a DSA key
    /// or the (p, q, g, y) components are rejected.
    pub fn dsa(&self) -> Result<dsa::VerifyingKey, KeyError> {
        let data = self.data.dsa().ok_or(KeyError::UnsupportedEncoding)?;
        let p = mpint_to_uint(&data.p)?;
        let q = mpint_to_uint(&data.q)?;
        let g = mpint_to_uint(&data.g)?;
        let y = mpint_to_uint(&data.y)?;
        let components =
            dsa::Components::from_components(p, q, g).map_err(|_| KeyError::UnsupportedEncoding)?;
        dsa::VerifyingKey::from_components(components, y)
            .map_err(|_| KeyError::UnsupportedEncoding)
    }
}

fn mpint_to_uint(mpint: &ssh_key::Mpint) -> Result<BigUint, KeyError> {
    mpint
        .as_positive_bytes()
        .map(BigUint::from_bytes_be)
        .ok_or(KeyError::UnsupportedEncoding)
}

/// Parse a stored public-key record.
///
/// The leading token must be one of the four supported algorithm tags and
/// the base64 blob must decode to a structurally valid key of the same
/// algorithm. For RSA the key material is additionally converted into a
/// working key object up front, so a record that passes here is usable by
/// both the challenge cipher and the response verifier.
///
/// Pure function; no side effects.
///
/// # Errors
///
/// - `KeyError::Malformed` - unrecognized tag, bad base64, or a blob that
///   does not match the advertised algorithm
/// - `KeyError::UnsupportedEncoding` - RSA key material the crypto
///   backend cannot use
pub fn parse(record: &str) -> Result<ParsedKey, KeyError> {
    let record = record.trim();

    let tag = record.split_whitespace().next().ok_or(KeyError::Malformed)?;
    let public_key =
        ssh_key::PublicKey::from_openssh(record).map_err(|_| KeyError::Malformed)?;

    let algorithm =
        KeyAlgorithm::from_ssh(&public_key.algorithm()).ok_or(KeyError::Malformed)?;

    // The textual tag and the name embedded in the wire blob must agree.
    if tag != algorithm.tag() {
        return Err(KeyError::Malformed);
    }

    let parsed = ParsedKey {
        algorithm,
        data: public_key.key_data().clone(),
        record: record.to_string(),
    };

    // RSA records must yield a usable key object at parse time; the other
    // algorithms are constructed lazily by the verifier.
    if algorithm == KeyAlgorithm::Rsa {
        parsed.rsa()?;
    }

    Ok(parsed)
}
