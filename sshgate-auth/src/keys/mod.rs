//! Typed decoding of stored SSH public-key records.
//!
//! A record is the exact text a user registers: an algorithm tag, a
//! base64-encoded key blob, and an optional comment. Parsing yields a
//! [`ParsedKey`] whose [`KeyAlgorithm`] is a closed enum, so every
//! algorithm-specific branch in the crate is matched exhaustively and
//! adding an algorithm is a compile-checked change.
//!
//! Supported records:
//!
//! - `ssh-rsa` - usable for both challenge encryption and signature checks
//! - `ssh-ed25519`, `ecdsa-sha2-nistp256`, `ssh-dss` - signature-only
//!
//! # Example
//!
//! ```
//! use sshgate_auth::keys::{self, KeyAlgorithm};
//!
//! let record = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIKqW0ZBT9J0b4+AB1wJverPPCCSisGnWkAF5uUXpGXgV demo";
//! let key = keys::parse(record).unwrap();
//! assert_eq!(key.algorithm(), KeyAlgorithm::Ed25519);
//! ```

mod codec;

pub use codec::{parse, KeyAlgorithm, KeyError, ParsedKey};
