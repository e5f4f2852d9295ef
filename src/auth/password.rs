//! Password hashing.

use bcrypt::BcryptError;

pub const HASH_COST: u32 = 10;

pub fn hash(password: &str) -> Result<String, BcryptError> {
    bcrypt::hash(password, HASH_COST)
}

/// `false` for a wrong password and for a malformed stored hash.
pub fn verify(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            log::warn!("stored password hash could not be checked: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        // Low cost keeps the test fast; verification reads the cost from the hash.
        let hashed = bcrypt::hash("Pass1234!", 4).unwrap();
        assert!(verify("Pass1234!", &hashed));
        assert!(!verify("pass1234!", &hashed));
    }

    #[test]
    fn test_hash_uses_configured_cost() {
        let hashed = hash("secret").unwrap();
        assert!(hashed.starts_with("$2b$10$"), "{hashed}");
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify("anything", "not-a-bcrypt-hash"));
    }
}
