use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Get current Unix timestamp in seconds
pub fn get_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Fresh UUID v4 record id
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString},
    };
    use rand::rngs::OsRng;

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))
}

/// Verify a password against its hash
pub fn verify_password(hash: &str, password: &str) -> anyhow::Result<bool> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHash, PasswordVerifier},
    };

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Validate email format (basic validation)
pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// Referral code prefix: the first three characters of `name` upper-cased,
/// with every non `A-Z` character replaced by `PAR`.
pub fn referral_prefix(name: &str) -> String {
    name.chars()
        .take(3)
        .flat_map(char::to_uppercase)
        .map(|c| {
            if c.is_ascii_uppercase() {
                c.to_string()
            } else {
                "PAR".to_string()
            }
        })
        .collect()
}

/// Prefix plus four random upper-case hex digits, e.g. `LIA3F0B`.
pub fn generate_referral_code(name: &str) -> String {
    let suffix: u16 = rand::thread_rng().r#gen();
    format!("{}{:04X}", referral_prefix(name), suffix)
}

/// Trim and drop NUL bytes from user-supplied text
pub fn sanitize_string(input: &str) -> String {
    input.replace('\0', "").trim().to_string()
}
