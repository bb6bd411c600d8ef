// Password hashing using Argon2id
// Decision: Use Argon2id as it's the recommended algorithm for password hashing
// Decision: Use default parameters which are secure for most use cases

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password using Argon2id with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
///
/// A malformed or truncated hash verifies as `false` rather than erroring:
/// login must answer yes/no, and the caller has nothing useful to do with a
/// parse failure on a digest it does not own.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "my-secure-password-123!";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn test_different_hashes() {
        let password = "same-password";
        let hash1 = hash_password(password).unwrap();
        let hash2 = hash_password(password).unwrap();

        // Same password should produce different hashes (different salts)
        assert_ne!(hash1, hash2);

        // But both should verify correctly
        assert!(verify_password(password, &hash1));
        assert!(verify_password(password, &hash2));
    }

    #[test]
    fn test_hash_format() {
        let hash = hash_password("test").unwrap();
        // Argon2id hash starts with $argon2id$
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_unicode_password() {
        let password = "pässwörd-契約-🔐";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash));
        assert!(!verify_password("pässwörd-契約-🔑", &hash));
    }

    #[test]
    fn test_long_password() {
        // Longer than the 72-byte limit some schemes truncate at; the full
        // input must participate in the digest.
        let password = "x".repeat(200);
        let hash = hash_password(&password).unwrap();
        assert!(verify_password(&password, &hash));

        let mut truncated = password.clone();
        truncated.pop();
        assert!(!verify_password(&truncated, &hash));
    }

    #[test]
    fn test_single_character_mutations_fail() {
        let password = "correct horse battery staple";
        let hash = hash_password(password).unwrap();

        for i in 0..password.len() {
            let mut mutated: Vec<u8> = password.as_bytes().to_vec();
            mutated[i] = mutated[i].wrapping_add(1);
            let mutated = String::from_utf8(mutated).unwrap();
            assert!(
                !verify_password(&mutated, &hash),
                "mutation at byte {} unexpectedly verified",
                i
            );
        }
    }

    #[test]
    fn test_malformed_hash_is_false_not_error() {
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", "$argon2id$truncated"));
    }
}
