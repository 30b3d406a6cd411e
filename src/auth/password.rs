use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use tokio::task;

use crate::error::TrainerError;

/// Hash a password with Argon2 and a random salt, returning the PHC string.
/// Runs on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, TrainerError> {
    let password = password.to_string();

    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| TrainerError::PasswordHash(format!("failed to hash password: {e}")))
    })
    .await
    .map_err(|e| TrainerError::PasswordHash(format!("hashing task failed: {e}")))?
}

/// Check `password` against a stored PHC string. A mismatch is `Ok(false)`;
/// a malformed hash is an error.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, TrainerError> {
    let password = password.to_string();
    let hash = hash.to_string();

    task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| TrainerError::PasswordHash(format!("invalid password hash: {e}")))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(TrainerError::PasswordHash(format!(
                "password verification failed: {e}"
            ))),
        }
    })
    .await
    .map_err(|e| TrainerError::PasswordHash(format!("verification task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_verifies_only_the_original_password() {
        let hash = hash_password("changeme").await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("changeme", &hash).await.unwrap());
        assert!(!verify_password("changeme ", &hash).await.unwrap());
        assert!(!verify_password("", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_gets_distinct_salts() {
        let a = hash_password("changeme").await.unwrap();
        let b = hash_password("changeme").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        let err = verify_password("changeme", "sha256$not-a-phc-string").await.unwrap_err();
        assert!(matches!(err, TrainerError::PasswordHash(_)));
    }
}
