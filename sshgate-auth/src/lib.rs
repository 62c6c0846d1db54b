//! Pure challenge/response authentication library for sshgate.
//!
//! This crate is intentionally IO-free:
//! - No filesystem operations
//! - No network calls
//! - No database interactions
//! - No logging
//!
//! It covers the protocol-sensitive half of SSH-key authentication:
//! parsing stored public-key records, generating one-time challenges,
//! sealing them for keys that support encryption, verifying returned
//! proofs, and tracking pending challenges until they are consumed or
//! expire. User lookup and session persistence stay outside; callers
//! inject them around [`ledger::ChallengeLedger`].
//!
//! # Example
//!
//! ```ignore
//! use sshgate_auth::{keys, challenge, ledger::ChallengeLedger};
//!
//! let key = keys::parse("ssh-ed25519 AAAA... alice@laptop")?;
//! let text = challenge::ChallengeText::generate();
//!
//! // later, when the client returns a signature over the text:
//! let ok = challenge::verify(text.as_bytes(), &response, &key)?;
//! ```

pub mod challenge;
pub mod keys;
pub mod ledger;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use challenge::{ChallengeText, CipherError, VerifyError};
pub use keys::{KeyAlgorithm, KeyError, ParsedKey};
pub use ledger::{Challenge, ChallengeLedger};
