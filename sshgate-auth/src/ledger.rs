//! Pending-challenge ledger.
//!
//! Tracks the single outstanding challenge per user id from issuance to
//! consumption or expiry. The ledger is an explicit, injectable object -
//! construct one per process and share it by handle; it is never a
//! hidden global.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::challenge::ChallengeText;
use crate::keys::KeyAlgorithm;

/// Default window in which a pending challenge may be answered.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(5 * 60);

/// An issued challenge awaiting its response.
#[derive(Debug, Clone)]
pub struct Challenge {
    /// The user this challenge was issued to.
    pub user_id: String,
    /// The text the client must produce a proof over.
    pub text: ChallengeText,
    /// RSA flow only: the sealed form delivered to the client.
    pub ciphertext: Option<Vec<u8>>,
    /// Algorithm of the key the challenge was bound to.
    pub algorithm: KeyAlgorithm,
    /// The exact public-key record used at issuance. Verification fails
    /// closed if the directory record no longer matches.
    pub key_record: String,
    /// Wall-clock issuance time.
    pub created_at: DateTime<Utc>,
}

struct PendingEntry {
    challenge: Challenge,
    issued: Instant,
}

/// Per-user challenge state: `NONE -> PENDING -> {CONSUMED, EXPIRED}`.
///
/// # Concurrency
///
/// Issue and consume are safe across user ids and linearizable for the
/// same id: `consume` removes the entry atomically, so of two racing
/// consumers exactly one receives the challenge and the other observes
/// absence. Re-issuing while a challenge is pending replaces it.
///
/// # Expiry
///
/// Entries older than the TTL are treated as absent by both [`peek`] and
/// [`consume`] (lazy expiry). [`sweep_expired`] reclaims memory and is
/// optional for correctness.
///
/// [`peek`]: ChallengeLedger::peek
/// [`consume`]: ChallengeLedger::consume
/// [`sweep_expired`]: ChallengeLedger::sweep_expired
pub struct ChallengeLedger {
    entries: DashMap<String, PendingEntry>,
    ttl: Duration,
}

impl ChallengeLedger {
    /// Create a ledger with the given challenge TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// The configured challenge TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record a pending challenge, replacing any prior challenge for the
    /// same user id. At most one challenge is live per user at any time.
    pub fn issue(&self, challenge: Challenge) {
        let user_id = challenge.user_id.clone();
        self.entries.insert(
            user_id,
            PendingEntry {
                challenge,
                issued: Instant::now(),
            },
        );
    }

    /// Read the pending challenge without consuming it.
    ///
    /// Returns `None` when nothing is pending or the entry's TTL has
    /// elapsed.
    #[must_use]
    pub fn peek(&self, user_id: &str) -> Option<Challenge> {
        let entry = self.entries.get(user_id)?;
        if entry.issued.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.challenge.clone())
    }

    /// Atomically take the pending challenge for a user.
    ///
    /// Exactly one caller can win an entry; a concurrent second consume
    /// observes absence, which guarantees at most one verification
    /// outcome per issued challenge. Expired entries are removed and
    /// reported as absent.
    #[must_use]
    pub fn consume(&self, user_id: &str) -> Option<Challenge> {
        let (_, entry) = self.entries.remove(user_id)?;
        if entry.issued.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.challenge)
    }

    /// Drop expired entries.
    ///
    /// Not required for correctness - expired entries are ignored on
    /// read - but bounds memory held for abandoned flows.
    pub fn sweep_expired(&self) {
        self.entries
            .retain(|_, entry| entry.issued.elapsed() < self.ttl);
    }

    /// Number of tracked entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ChallengeLedger {
    fn default() -> Self {
        Self::new(DEFAULT_CHALLENGE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn test_challenge(user_id: &str) -> Challenge {
        Challenge {
            user_id: user_id.to_string(),
            text: ChallengeText::generate(),
            ciphertext: None,
            algorithm: KeyAlgorithm::Ed25519,
            key_record: "ssh-ed25519 AAAA test".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn consume_returns_some_exactly_once() {
        let ledger = ChallengeLedger::default();
        ledger.issue(test_challenge("alice"));

        assert!(ledger.consume("alice").is_some());
        assert!(ledger.consume("alice").is_none());

        // A fresh issue arms the ledger again.
        ledger.issue(test_challenge("alice"));
        assert!(ledger.consume("alice").is_some());
    }

    #[test]
    fn peek_does_not_consume() {
        let ledger = ChallengeLedger::default();
        ledger.issue(test_challenge("alice"));

        assert!(ledger.peek("alice").is_some());
        assert!(ledger.peek("alice").is_some());
        assert!(ledger.consume("alice").is_some());
        assert!(ledger.peek("alice").is_none());
    }

    #[test]
    fn reissue_replaces_pending_challenge() {
        let ledger = ChallengeLedger::default();

        ledger.issue(test_challenge("alice"));
        let first = ledger.peek("alice").unwrap();

        ledger.issue(test_challenge("alice"));
        let second = ledger.consume("alice").unwrap();

        assert_ne!(first.text, second.text);
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn user_ids_do_not_interfere() {
        let ledger = ChallengeLedger::default();
        ledger.issue(test_challenge("alice"));
        ledger.issue(test_challenge("bob"));

        assert!(ledger.consume("alice").is_some());
        assert!(ledger.consume("bob").is_some());
        assert!(ledger.consume("carol").is_none());
    }

    #[test]
    fn expired_challenge_is_absent() {
        let ledger = ChallengeLedger::new(Duration::from_millis(10));
        ledger.issue(test_challenge("alice"));

        thread::sleep(Duration::from_millis(20));

        assert!(ledger.peek("alice").is_none());
        assert!(ledger.consume("alice").is_none());
    }

    #[test]
    fn sweep_removes_expired_entries() {
        let ledger = ChallengeLedger::new(Duration::from_millis(10));
        ledger.issue(test_challenge("alice"));
        assert_eq!(ledger.len(), 1);

        thread::sleep(Duration::from_millis(20));
        ledger.sweep_expired();

        assert!(ledger.is_empty());
    }

    #[test]
    fn concurrent_consume_has_one_winner() {
        let ledger = Arc::new(ChallengeLedger::default());
        ledger.issue(test_challenge("alice"));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.consume("alice").is_some())
            })
            .collect();

        let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|&&won| won).count();
        assert_eq!(wins, 1, "exactly one concurrent consume should win");
    }
}
