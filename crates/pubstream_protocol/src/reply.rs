//! Reply-subject generators.
//!
//! Each streaming session needs a subject nobody else is using. The
//! generators here trade generation cost against collision resistance; the
//! transport may also offer its own inbox generator.

use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, SeedableRng};
use std::fmt;
use uuid::Uuid;

/// Produces a fresh subject for one session.
///
/// Implementations never fail and never block on I/O.
pub trait ReplySubject: Send + Sync {
    /// Returns a subject not used by any concurrently active session.
    fn reply_subject(&self) -> String;
}

impl<F> ReplySubject for F
where
    F: Fn() -> String + Send + Sync,
{
    fn reply_subject(&self) -> String {
        self()
    }
}

/// Generates a correlation token for a session.
pub fn new_uid() -> String {
    Uuid::new_v4().simple().to_string()
}

fn join(prefix: &str, suffix: String) -> String {
    if prefix.is_empty() {
        suffix
    } else {
        format!("{prefix}.{suffix}")
    }
}

/// Non-cryptographic generator backed by a small, fast PRNG.
///
/// 22 alphanumeric characters give about 131 bits of suffix, ample for
/// short-lived sessions between cooperating peers.
pub struct FastRandom {
    prefix: String,
    rng: Mutex<SmallRng>,
}

impl FastRandom {
    /// Length of the random suffix.
    pub const SUFFIX_LEN: usize = 22;

    /// Creates a generator producing `<prefix>.<suffix>` subjects.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('.').to_string(),
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }

    /// Creates a generator with a fixed seed, for reproducible tests.
    pub fn seeded(prefix: impl Into<String>, seed: u64) -> Self {
        let mut generator = Self::new(prefix);
        generator.rng = Mutex::new(SmallRng::seed_from_u64(seed));
        generator
    }
}

impl Default for FastRandom {
    fn default() -> Self {
        Self::new("_INBOX")
    }
}

impl fmt::Debug for FastRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastRandom")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl ReplySubject for FastRandom {
    fn reply_subject(&self) -> String {
        let mut rng = self.rng.lock();
        let suffix: String = (&mut *rng)
            .sample_iter(&Alphanumeric)
            .take(Self::SUFFIX_LEN)
            .map(char::from)
            .collect();
        join(&self.prefix, suffix)
    }
}

/// Generator drawing from the operating system's CSPRNG.
///
/// Use when subjects must not be guessable by other tenants of the broker.
#[derive(Debug, Clone)]
pub struct CryptoRandom {
    prefix: String,
}

impl CryptoRandom {
    /// Length of the random suffix.
    pub const SUFFIX_LEN: usize = 32;

    /// Creates a generator producing `<prefix>.<suffix>` subjects.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('.').to_string(),
        }
    }
}

impl Default for CryptoRandom {
    fn default() -> Self {
        Self::new("_INBOX")
    }
}

impl ReplySubject for CryptoRandom {
    fn reply_subject(&self) -> String {
        let suffix: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(Self::SUFFIX_LEN)
            .map(char::from)
            .collect();
        join(&self.prefix, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::is_valid_subject;
    use std::collections::HashSet;

    fn assert_unique_and_valid(generator: &dyn ReplySubject, prefix: &str) {
        let mut seen = HashSet::new();
        for _ in 0..1_000 {
            let subject = generator.reply_subject();
            assert!(is_valid_subject(&subject), "invalid subject {subject}");
            assert!(subject.starts_with(prefix));
            assert!(seen.insert(subject));
        }
    }

    #[test]
    fn fast_random_subjects() {
        let generator = FastRandom::new("_STREAM.");
        assert_unique_and_valid(&generator, "_STREAM.");
        let subject = generator.reply_subject();
        assert_eq!(subject.len(), "_STREAM.".len() + FastRandom::SUFFIX_LEN);
    }

    #[test]
    fn seeded_fast_random_is_reproducible() {
        let a = FastRandom::seeded("_INBOX", 7);
        let b = FastRandom::seeded("_INBOX", 7);
        assert_eq!(a.reply_subject(), b.reply_subject());
    }

    #[test]
    fn crypto_random_subjects() {
        let generator = CryptoRandom::default();
        assert_unique_and_valid(&generator, "_INBOX.");
    }

    #[test]
    fn closures_are_generators() {
        let generator = || "fixed.subject".to_string();
        assert_eq!(generator.reply_subject(), "fixed.subject");
    }

    #[test]
    fn empty_prefix_yields_bare_suffix() {
        let subject = CryptoRandom::new("").reply_subject();
        assert_eq!(subject.len(), CryptoRandom::SUFFIX_LEN);
        assert!(!subject.contains('.'));
    }

    #[test]
    fn uids_are_unique() {
        assert_ne!(new_uid(), new_uid());
        assert_eq!(new_uid().len(), 32);
    }
}
