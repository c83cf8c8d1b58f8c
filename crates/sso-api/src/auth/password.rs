/// Password hashing and verification using Argon2id
///
/// Every new hash uses the cost parameters fixed at startup. Verification
/// reads the parameters embedded in the stored PHC string, so raising the
/// cost later does not break existing hashes.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use sso_core::PasswordSettings;
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// One-way credential hashing
///
/// Both operations are CPU-bound and deliberately slow; callers run them off
/// the async executor.
pub trait CredentialHasher: Send + Sync + 'static {
    /// Produce a salted, irreversible digest of `password`
    fn hash(&self, password: &str) -> Result<Vec<u8>, PasswordError>;

    /// Check `password` against a stored digest.
    ///
    /// A mismatch is `Ok(false)`, never an error.
    fn verify(&self, hash: &[u8], password: &str) -> Result<bool, PasswordError>;
}

/// Password hashing configuration
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl From<&PasswordSettings> for PasswordConfig {
    fn from(settings: &PasswordSettings) -> Self {
        Self {
            memory_cost: settings.memory_cost,
            time_cost: settings.time_cost,
            parallelism: settings.parallelism,
            ..Default::default()
        }
    }
}

impl PasswordConfig {
    /// Create Argon2 parameters from this configuration
    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Argon2id implementation of [`CredentialHasher`]
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Build a hasher, rejecting cost parameters Argon2 cannot use
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        Ok(Self {
            params: config.to_params()?,
        })
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<Vec<u8>, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        );

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string().into_bytes())
    }

    fn verify(&self, hash: &[u8], password: &str) -> Result<bool, PasswordError> {
        let hash = std::str::from_utf8(hash).map_err(|_| PasswordError::InvalidHashFormat)?;
        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }
}
