use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Hash a password with a fresh random salt. Returns (hash, salt), both
/// lowercase hex. The salt is stored alongside the hash; neither leaves
/// the process through exports.
pub fn hash_password(password: &str) -> (String, String) {
    let salt = Uuid::new_v4().simple().to_string();
    let hash = hash_with_salt(password, &salt);
    (hash, salt)
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_with_salt(password, salt) == expected_hash
}

fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Opaque session token. The token is a capability handed back to the
/// caller; nothing in the core ever parses it.
pub fn mint_token() -> String {
    Uuid::new_v4().to_string()
}
