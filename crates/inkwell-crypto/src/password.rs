use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("stored password hash is malformed")]
    InvalidHashFormat,
}

/// Argon2id password hasher with a fixed work factor.
///
/// The cost parameters only apply to new hashes. Verification reads the
/// parameters embedded in the stored PHC string, so raising the cost later
/// does not invalidate existing passwords.
#[derive(Debug, Clone, Default)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// `memory_kib` and `iterations` are the Argon2 m_cost and t_cost.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| HashError::Hashing(e.to_string()))?;
        Ok(Self { params })
    }

    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| HashError::Hashing(e.to_string()))
    }

    /// Returns `Ok(false)` on a plain mismatch; errors only when `hashed` is
    /// not a usable PHC string.
    pub fn verify(&self, hashed: &str, candidate: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(hashed).map_err(|_| HashError::InvalidHashFormat)?;

        match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(_) => Err(HashError::InvalidHashFormat),
        }
    }
}
