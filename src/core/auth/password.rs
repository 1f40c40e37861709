//! Password hashing
//!
//! One-way salted hashing with bcrypt. Verification delegates to bcrypt's own
//! comparison so timing does not depend on where the digests differ.

/// Cost factor for bcrypt hashing (12 is recommended for production)
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Password hashing errors
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Bcrypt password hasher with a fixed cost factor
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher; the cost is clamped to the range bcrypt accepts
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(4, 31),
        }
    }

    /// Hash a password with a freshly generated salt
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        bcrypt::hash(password, self.cost).map_err(|e| PasswordError::HashingError(e.to_string()))
    }

    /// Verify a password against a bcrypt digest
    pub fn verify(&self, password: &str, digest: &str) -> Result<bool, PasswordError> {
        bcrypt::verify(password, digest).map_err(|e| PasswordError::MalformedHash(e.to_string()))
    }
}
