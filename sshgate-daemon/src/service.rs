//! Authentication flow orchestration.
//!
//! [`Authenticator`] drives a flow from challenge issuance to an
//! authenticated session: directory lookup, key parsing, challenge
//! generation, the encrypt-vs-sign branch, ledger bookkeeping,
//! verification, and session promotion. It holds no hidden state - the
//! ledger and both stores are injected handles.

use std::sync::Arc;
use std::time::Duration;

use base64::prelude::*;
use chrono::Utc;
use serde::Serialize;
use subtle::ConstantTimeEq;

use sshgate_auth::challenge::{self, ChallengeText, CipherError, VerifyError};
use sshgate_auth::keys::{self, KeyAlgorithm};
use sshgate_auth::ledger::{Challenge, ChallengeLedger};

use crate::directory::{DirectoryError, UserDirectory};
use crate::sessions::{
    generate_token, AuthenticatedSession, SessionStore, SessionStoreError,
};

/// Errors from the authentication flow.
///
/// Callers surface exactly one generic message for all of these; the
/// variants exist for logging and for tests. `NoPendingChallenge`
/// deliberately covers never-issued, expired, and already-consumed
/// challenges alike so responses leak nothing about ledger state.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("unknown user")]
    UnknownUser,
    #[error("stored public key is invalid")]
    InvalidStoredKey,
    #[error("no pending challenge")]
    NoPendingChallenge,
    #[error("verification failed")]
    VerificationFailed,
    #[error("directory failure: {0}")]
    Directory(#[from] DirectoryError),
    #[error("session store failure: {0}")]
    SessionStore(#[from] SessionStoreError),
    #[error("challenge cipher failure: {0}")]
    Cipher(#[from] CipherError),
    #[error("verifier failure: {0}")]
    Verifier(#[from] VerifyError),
}

impl AuthError {
    /// Whether this failure is attributable to the caller rather than an
    /// internal fault. Drives the HTTP 401-vs-500 split; either way the
    /// response body stays generic.
    #[must_use]
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::UnknownUser | Self::NoPendingChallenge | Self::VerificationFailed
        )
    }
}

/// The JSON object handed to the client device, shaped for the
/// browser-extension contract: `challenge` is base64 ciphertext for the
/// RSA flow and the cleartext challenge text for signature-mode keys.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengePayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub challenge: String,
    pub algorithm: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// Outcome of a completed authentication.
#[derive(Debug, Clone, Serialize)]
pub struct SessionGrant {
    pub session_token: String,
    pub user_id: String,
}

/// Orchestrates issue -> await response -> verify -> promote.
pub struct Authenticator {
    directory: Arc<dyn UserDirectory>,
    sessions: Arc<dyn SessionStore>,
    ledger: Arc<ChallengeLedger>,
    session_ttl: Duration,
}

impl Authenticator {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        sessions: Arc<dyn SessionStore>,
        ledger: Arc<ChallengeLedger>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            directory,
            sessions,
            ledger,
            session_ttl,
        }
    }

    /// Issue a challenge for a user.
    ///
    /// Replaces any pending challenge for the same user id. RSA keys get
    /// a sealed challenge; signature-only keys get the cleartext text to
    /// sign.
    pub async fn begin(&self, user_id: &str) -> Result<ChallengePayload, AuthError> {
        let user = self
            .directory
            .lookup_by_id(user_id)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        // Validated at registration; a parse failure here means the
        // stored record was corrupted after the fact.
        let key = keys::parse(&user.public_key_record).map_err(|e| {
            tracing::error!(user_id, error = %e, "stored public key no longer parses");
            AuthError::InvalidStoredKey
        })?;

        let text = ChallengeText::generate();
        let (wire_challenge, ciphertext) = match key.algorithm() {
            KeyAlgorithm::Rsa => {
                let sealed = challenge::encrypt(text.as_bytes(), &key)?;
                (BASE64_STANDARD.encode(&sealed), Some(sealed))
            }
            KeyAlgorithm::Ed25519 | KeyAlgorithm::EcdsaP256 | KeyAlgorithm::Dsa => {
                (text.as_str().to_string(), None)
            }
        };

        self.ledger.issue(Challenge {
            user_id: user.id.clone(),
            text,
            ciphertext,
            algorithm: key.algorithm(),
            key_record: user.public_key_record.clone(),
            created_at: Utc::now(),
        });

        tracing::info!(
            user_id = %user.id,
            algorithm = %key.algorithm(),
            encrypted = key.algorithm().supports_encryption(),
            "challenge issued"
        );

        Ok(ChallengePayload {
            kind: "ssh",
            challenge: wire_challenge,
            algorithm: key.algorithm().tag().to_string(),
            public_key: user.public_key_record,
        })
    }

    /// Verify a response and promote the flow to an authenticated
    /// session.
    ///
    /// The pending challenge is consumed up front, so each issued
    /// challenge sees at most one verification attempt regardless of
    /// outcome; a failed attempt requires a fresh `begin`.
    pub async fn complete(
        &self,
        user_id: &str,
        response_b64: &str,
    ) -> Result<SessionGrant, AuthError> {
        let challenge = self
            .ledger
            .consume(user_id)
            .ok_or(AuthError::NoPendingChallenge)?;

        let response = BASE64_STANDARD
            .decode(response_b64.trim())
            .map_err(|_| AuthError::VerificationFailed)?;

        let user = self
            .directory
            .lookup_by_id(user_id)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        // Fail closed if the directory record changed between issuance
        // and completion.
        let record_unchanged: bool = user
            .public_key_record
            .as_bytes()
            .ct_eq(challenge.key_record.as_bytes())
            .into();
        if !record_unchanged {
            tracing::warn!(user_id, "public key changed mid-flight, rejecting");
            return Err(AuthError::VerificationFailed);
        }

        let key = keys::parse(&user.public_key_record).map_err(|e| {
            tracing::error!(user_id, error = %e, "stored public key no longer parses");
            AuthError::InvalidStoredKey
        })?;

        let verified = challenge::verify(challenge.text.as_bytes(), &response, &key)?;
        if !verified {
            tracing::warn!(user_id, algorithm = %key.algorithm(), "response verification failed");
            return Err(AuthError::VerificationFailed);
        }

        let session = AuthenticatedSession {
            user_id: user.id.clone(),
            established_at: Utc::now().timestamp(),
        };
        let token = generate_token();
        self.sessions
            .put(&token, session, self.session_ttl)
            .await?;

        tracing::info!(user_id = %user.id, algorithm = %key.algorithm(), "authentication succeeded");

        Ok(SessionGrant {
            session_token: token,
            user_id: user.id,
        })
    }

    /// Read back an authenticated session, if the token is live.
    pub async fn session(
        &self,
        token: &str,
    ) -> Result<Option<AuthenticatedSession>, AuthError> {
        Ok(self.sessions.get(token).await?)
    }

    /// Destroy a session. Idempotent.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.delete(token).await?;
        tracing::info!("session destroyed");
        Ok(())
    }

    /// Handle to the ledger, for periodic sweeps and tests.
    #[must_use]
    pub fn ledger(&self) -> &ChallengeLedger {
        &self.ledger
    }
}
