//! Password hashing
//!
//! New hashes are PBKDF2-HMAC-SHA256 encoded as
//! `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`. Accounts imported
//! from the old site carry bare 32-char MD5 hex digests; those still verify
//! and are flagged for rehashing.

use sha2::Sha256;
use tokio::task::JoinError;

/// Iteration count for new hashes
pub const DEFAULT_ITERATIONS: u32 = 100_000;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Result of checking a password against a stored hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid,
    /// Correct password, but the stored hash should be replaced
    ValidNeedsRehash,
    Invalid,
}

impl Verification {
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash with a fresh random salt
    pub fn hash(&self, password: &str) -> String {
        let salt: [u8; SALT_LEN] = rand::random();
        let digest = derive(password, &salt, self.iterations);
        format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            hex::encode(salt),
            hex::encode(digest)
        )
    }

    pub fn verify(&self, password: &str, stored: &str) -> Verification {
        if let Some(rest) = stored.strip_prefix(SCHEME).and_then(|r| r.strip_prefix('$')) {
            return self.verify_pbkdf2(password, rest);
        }
        if is_legacy_md5(stored) {
            let candidate = format!("{:x}", md5::compute(password.as_bytes()));
            return if constant_time_eq(candidate.as_bytes(), stored.to_ascii_lowercase().as_bytes()) {
                Verification::ValidNeedsRehash
            } else {
                Verification::Invalid
            };
        }
        tracing::warn!("Unrecognised password hash format");
        Verification::Invalid
    }

    /// Same work as checking a real hash, always `Invalid`.
    ///
    /// Used when no account matches so response time does not reveal
    /// which emails are registered.
    pub fn verify_missing(&self, password: &str) -> Verification {
        std::hint::black_box(derive(password, &[0u8; SALT_LEN], self.iterations));
        Verification::Invalid
    }

    /// [`hash`](Self::hash) on the blocking thread pool
    pub async fn hash_blocking(self, password: String) -> Result<String, JoinError> {
        tokio::task::spawn_blocking(move || self.hash(&password)).await
    }

    /// [`verify`](Self::verify) on the blocking thread pool; `None` runs
    /// [`verify_missing`](Self::verify_missing)
    pub async fn verify_blocking(
        self,
        password: String,
        stored: Option<String>,
    ) -> Result<Verification, JoinError> {
        tokio::task::spawn_blocking(move || match stored {
            Some(stored) => self.verify(&password, &stored),
            None => self.verify_missing(&password),
        })
        .await
    }

    fn verify_pbkdf2(&self, password: &str, encoded: &str) -> Verification {
        let mut parts = encoded.splitn(3, '$');
        let (Some(iterations), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
        else {
            return Verification::Invalid;
        };
        let (Ok(iterations), Ok(salt), Ok(expected)) = (
            iterations.parse::<u32>(),
            hex::decode(salt),
            hex::decode(expected),
        ) else {
            return Verification::Invalid;
        };
        if iterations == 0 || expected.len() != HASH_LEN {
            return Verification::Invalid;
        }

        let digest = derive(password, &salt, iterations);
        if !constant_time_eq(&digest, &expected) {
            Verification::Invalid
        } else if iterations < self.iterations {
            Verification::ValidNeedsRehash
        } else {
            Verification::Valid
        }
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn is_legacy_md5(stored: &str) -> bool {
    stored.len() == 32 && stored.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Compare without short-circuiting on the first differing byte
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    #[test]
    fn hash_then_verify() {
        let h = hasher();
        let stored = h.hash("correct horse");
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert_eq!(h.verify("correct horse", &stored), Verification::Valid);
        assert_eq!(h.verify("wrong horse", &stored), Verification::Invalid);
    }

    #[test]
    fn salts_differ() {
        let h = hasher();
        assert_ne!(h.hash("same"), h.hash("same"));
    }

    #[test]
    fn legacy_md5_verifies_and_needs_rehash() {
        // md5("password")
        let legacy = "5f4dcc3b5aa765d61d8327deb882cf99";
        let h = hasher();
        assert_eq!(h.verify("password", legacy), Verification::ValidNeedsRehash);
        assert_eq!(
            h.verify("password", &legacy.to_uppercase()),
            Verification::ValidNeedsRehash
        );
        assert_eq!(h.verify("Password", legacy), Verification::Invalid);
    }

    #[test]
    fn weaker_iteration_count_needs_rehash() {
        let old = PasswordHasher::new(500).hash("secret-pass");
        assert_eq!(hasher().verify("secret-pass", &old), Verification::ValidNeedsRehash);
    }

    #[test]
    fn malformed_hashes_are_invalid() {
        let h = hasher();
        for stored in [
            "",
            "plaintext",
            "pbkdf2-sha256$",
            "pbkdf2-sha256$abc$00$00",
            "pbkdf2-sha256$1000$zz$00",
            "pbkdf2-sha256$0$00$00",
        ] {
            assert_eq!(h.verify("anything", stored), Verification::Invalid, "{}", stored);
        }
    }

    #[test]
    fn missing_account_check_is_invalid() {
        assert_eq!(hasher().verify_missing("anything"), Verification::Invalid);
    }

    #[tokio::test]
    async fn blocking_pool_helpers_agree_with_inline() {
        let h = hasher();
        let stored = h.hash_blocking("correct horse".into()).await.unwrap();
        assert_eq!(h.verify("correct horse", &stored), Verification::Valid);
        assert_eq!(
            h.verify_blocking("correct horse".into(), Some(stored.clone())).await.unwrap(),
            Verification::Valid
        );
        assert_eq!(
            h.verify_blocking("wrong".into(), Some(stored)).await.unwrap(),
            Verification::Invalid
        );
        assert_eq!(
            h.verify_blocking("correct horse".into(), None).await.unwrap(),
            Verification::Invalid
        );
    }

    #[test]
    fn constant_time_eq_matches_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
