/// Password hashing using Argon2id
///
/// # Parameters
///
/// - **Algorithm**: Argon2id, version 0x13
/// - **Memory**: 64 MiB (65536 KiB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash, stored as a PHC string with a random 16-byte salt
///
/// Hashing is CPU and memory heavy. Request handlers call the `_blocking`
/// variants, which move the work onto tokio's blocking pool.
///
/// # Example
///
/// ```
/// use taskhub_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("wonderland42")?;
///
/// assert!(verify_password("wonderland42", &hash)?);
/// assert!(!verify_password("looking-glass7", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Minimum password length accepted at registration and password change
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a valid PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// The blocking task panicked or was cancelled
    #[error("Password worker failed: {0}")]
    WorkerFailed(String),
}

fn argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password, returning a PHC string
///
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// Returns `Ok(false)` on mismatch; errors are reserved for unreadable hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters come from the PHC string
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// [`hash_password`] on the blocking thread pool
pub async fn hash_password_blocking(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::WorkerFailed(e.to_string()))?
}

/// [`verify_password`] on the blocking thread pool
pub async fn verify_password_blocking(
    password: String,
    hash: String,
) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::WorkerFailed(e.to_string()))?
}

/// Checks the password policy: at least 8 characters, one letter and one digit
///
/// ```
/// use taskhub_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("wonderland42").is_ok());
/// assert!(validate_password_strength("short1").is_err());
/// assert!(validate_password_strength("12345678").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }

    if !password.chars().any(char::is_alphabetic) {
        return Err("Password must contain at least one letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_parameters() {
        let hash = hash_password("wonderland42").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_salts_differ() {
        let hash1 = hash_password("same_password1").expect("Hash 1 should succeed");
        let hash2 = hash_password("same_password1").expect("Hash 2 should succeed");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password1").expect("Hash should succeed");

        assert!(verify_password("correct_password1", &hash).unwrap());
        assert!(!verify_password("wrong_password1", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(matches!(
            verify_password("password", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let hash = hash_password_blocking("unicode-密码-42".to_string())
            .await
            .expect("Hash should succeed");

        assert!(verify_password_blocking("unicode-密码-42".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("unicode-42".to_string(), hash)
            .await
            .unwrap());
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password_strength("abcdefg1").is_ok());
        assert!(validate_password_strength("pässwörd9").is_ok());

        let short = validate_password_strength("abc1").unwrap_err();
        assert!(short.contains("at least 8 characters"));

        let no_letter = validate_password_strength("12345678").unwrap_err();
        assert!(no_letter.contains("letter"));

        let no_digit = validate_password_strength("abcdefgh").unwrap_err();
        assert!(no_digit.contains("digit"));
    }
}
