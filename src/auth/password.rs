use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Hash a plaintext credential with a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    match Argon2::default().hash_password(plain.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(e) => {
            error!(error = %e, "argon2 hash error");
            anyhow::bail!("password hashing failed")
        }
    }
}

/// The only comparison path for credentials; plaintext is never compared
/// directly or logged.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(error = %e, "stored password hash is malformed");
            anyhow::bail!("malformed password hash")
        }
    };
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("secret1").expect("hashing should succeed");
        assert!(verify_password("secret1", &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("pass123").expect("hashing should succeed");
        assert!(!verify_password("wrong", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn same_password_hashes_differently_but_both_verify() {
        let first = hash_password("pass123").expect("hash");
        let second = hash_password("pass123").expect("hash");
        assert_ne!(first, second);
        assert!(verify_password("pass123", &first).expect("verify"));
        assert!(verify_password("pass123", &second).expect("verify"));
    }
}
