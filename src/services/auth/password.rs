use tracing::warn;

/// Work-factor bounds accepted by bcrypt.
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Password hashing policy, kept behind a trait so the auth endpoints never depend on the
/// algorithm. Both operations are CPU-bound; async callers should run them on the blocking pool.
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, plain: &str, stored_hash: &str) -> bool;
    fn hash(&self, plain: &str) -> Result<String, PasswordError>;
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptVerifier {
    cost: u32,
}

impl BcryptVerifier {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordVerifier for BcryptVerifier {
    fn verify(&self, plain: &str, stored_hash: &str) -> bool {
        bcrypt::verify(plain, stored_hash).unwrap_or_else(|e| {
            // A broken stored hash is a data problem, not a wrong password.
            warn!(error = %e, "stored password hash could not be checked");
            false
        })
    }

    fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        Ok(bcrypt::hash(plain, self.cost)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let verifier = BcryptVerifier::new(MIN_COST);
        let hash = verifier.hash("s3cret-pass").unwrap();

        assert_ne!(hash, "s3cret-pass");
        assert!(verifier.verify("s3cret-pass", &hash));
        assert!(!verifier.verify("S3cret-pass", &hash));
    }

    #[test]
    fn corrupt_hash_never_verifies() {
        let verifier = BcryptVerifier::new(MIN_COST);
        assert!(!verifier.verify("anything", "not-a-bcrypt-hash"));
    }
}
