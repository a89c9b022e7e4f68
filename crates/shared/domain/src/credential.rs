//! Credential guard - idempotent hashing of secret fields.
//!
//! Stored credentials always use the Argon2 PHC string format. A value is
//! recognised as already hashed only when its structure matches the full
//! marker: `argon2id` algorithm, version 19, parsable cost parameters, a
//! 16-byte salt and a 32-byte output. Anything else is treated as raw input.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::constants::{HASH_ALGORITHM, HASH_OUTPUT_LENGTH, HASH_SALT_LENGTH, HASH_VERSION};
use crate::error::{DomainError, DomainResult};

/// Hashes and verifies credentials.
///
/// Cloning is cheap; the guard only carries cost parameters.
#[derive(Clone)]
pub struct CredentialGuard {
    params: Params,
}

impl std::fmt::Debug for CredentialGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGuard")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl Default for CredentialGuard {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialGuard {
    pub const DEFAULT_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;
    pub const DEFAULT_ITERATIONS: u32 = Params::DEFAULT_T_COST;
    pub const DEFAULT_PARALLELISM: u32 = Params::DEFAULT_P_COST;

    /// Guard using the Argon2 recommended cost.
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard with explicit cost parameters.
    ///
    /// # Errors
    /// Returns a validation error when Argon2 rejects the parameters.
    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> DomainResult<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, Some(HASH_OUTPUT_LENGTH))
            .map_err(|e| DomainError::validation(format!("Invalid hash cost: {}", e)))?;
        Ok(Self { params })
    }

    /// Return `value` in hashed form.
    ///
    /// Already-hashed values are returned unchanged so that repeated saves
    /// never hash a hash.
    ///
    /// # Errors
    /// Returns `Validation("credential required")` for empty input.
    pub fn ensure_hashed(&self, value: &str) -> DomainResult<String> {
        if value.is_empty() {
            return Err(DomainError::validation("credential required"));
        }
        if Self::is_hashed(value) {
            return Ok(value.to_string());
        }
        self.hash(value)
    }

    /// Check whether `value` carries the stored-credential marker.
    pub fn is_hashed(value: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(value) else {
            return false;
        };

        parsed.algorithm.as_str() == HASH_ALGORITHM
            && parsed.version == Some(HASH_VERSION)
            && Params::try_from(&parsed).is_ok()
            && parsed.salt.map(|s| s.as_str().len()) == Some(HASH_SALT_LENGTH)
            && parsed.hash.map(|h| h.len()) == Some(HASH_OUTPUT_LENGTH)
    }

    /// Verify a raw credential against a stored hash.
    ///
    /// A mismatch, or a stored value that is not a valid hash, is `Ok(false)`.
    ///
    /// # Errors
    /// Returns `Validation("credential required")` if either side is empty.
    pub fn verify(&self, raw: &str, hashed: &str) -> DomainResult<bool> {
        if raw.is_empty() || hashed.is_empty() {
            return Err(DomainError::validation("credential required"));
        }
        let Ok(parsed) = PasswordHash::new(hashed) else {
            return Ok(false);
        };
        Ok(self
            .argon2()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok())
    }

    fn hash(&self, raw: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| DomainError::internal(format!("Credential hash failed: {}", e)))?;
        Ok(hash.to_string())
    }

    #[inline]
    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> CredentialGuard {
        CredentialGuard::with_cost(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let guard = guard();
        let hashed = guard.ensure_hashed("secret1").unwrap();

        assert_ne!(hashed, "secret1");
        assert!(CredentialGuard::is_hashed(&hashed));
        assert!(guard.verify("secret1", &hashed).unwrap());
        assert!(!guard.verify("secret2", &hashed).unwrap());
    }

    #[test]
    fn test_ensure_hashed_is_idempotent() {
        let guard = guard();
        let once = guard.ensure_hashed("correct horse").unwrap();
        let twice = guard.ensure_hashed(&once).unwrap();

        assert_eq!(once, twice);
        assert!(guard.verify("correct horse", &twice).unwrap());
    }

    #[test]
    fn test_same_input_different_salts() {
        let guard = guard();
        let a = guard.ensure_hashed("same-value").unwrap();
        let b = guard.ensure_hashed("same-value").unwrap();

        assert_ne!(a, b);
        assert!(guard.verify("same-value", &a).unwrap());
        assert!(guard.verify("same-value", &b).unwrap());
    }

    #[test]
    fn test_hash_from_other_cost_still_recognised() {
        let stronger = CredentialGuard::with_cost(2048, 2, 1).unwrap();
        let hashed = stronger.ensure_hashed("rotate-me").unwrap();

        let weaker = guard();
        assert_eq!(weaker.ensure_hashed(&hashed).unwrap(), hashed);
        assert!(weaker.verify("rotate-me", &hashed).unwrap());
    }

    #[test]
    fn test_lookalike_values_are_treated_as_raw() {
        let bcrypt = "$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";
        let truncated = "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ";
        let wrong_algo = "$argon2i$v=19$m=1024,t=1,p=1$c2FsdHNhbHRzYWx0c2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

        assert!(!CredentialGuard::is_hashed(bcrypt));
        assert!(!CredentialGuard::is_hashed(truncated));
        assert!(!CredentialGuard::is_hashed(wrong_algo));
        assert!(!CredentialGuard::is_hashed("$argon2id$"));

        let guard = guard();
        let hashed = guard.ensure_hashed(bcrypt).unwrap();
        assert_ne!(hashed, bcrypt);
        assert!(guard.verify(bcrypt, &hashed).unwrap());
    }

    #[test]
    fn test_empty_credential_rejected() {
        let guard = guard();

        assert!(matches!(
            guard.ensure_hashed(""),
            Err(DomainError::Validation(msg)) if msg == "credential required"
        ));
        assert!(guard.verify("", "anything").is_err());
        assert!(guard.verify("anything", "").is_err());
    }

    #[test]
    fn test_verify_against_garbage_is_false() {
        let guard = guard();
        assert!(!guard.verify("secret1", "not-a-hash").unwrap());
    }
}
