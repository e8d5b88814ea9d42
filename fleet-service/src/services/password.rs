//! Admin password hashing and strength rules.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

const MIN_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "passwort", "12345678", "123456789", "1234567890", "qwertz123", "qwerty123",
    "password1", "passwort1", "iloveyou", "sunshine", "princess", "football", "baseball",
    "welcome1", "abc12345", "letmein1", "11111111", "00000000", "admin123", "hallo123",
];

/// Hash a password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// Constant-time verification against a stored hash.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("Password verification failed"))
}

/// Rejects short, numeric-only, common or username-derived passwords.
/// The returned message is shown to the user as-is.
pub fn check_strength(password: &str, username: &str) -> Result<(), String> {
    if password.chars().count() < MIN_LENGTH {
        return Err(format!(
            "Das Passwort muss mindestens {} Zeichen lang sein.",
            MIN_LENGTH
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("Das Passwort darf nicht nur aus Ziffern bestehen.".to_string());
    }
    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        return Err("Das Passwort ist zu gebräuchlich.".to_string());
    }
    if !username.is_empty() && lowered.contains(&username.to_lowercase()) {
        return Err("Das Passwort ist dem Benutzernamen zu ähnlich.".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("Lkw-Flotte-2024").expect("Failed to hash password");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Lkw-Flotte-2024", &hash).is_ok());
        assert!(verify_password("falsch", &hash).is_err());
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("Lkw-Flotte-2024").unwrap();
        let b = hash_password("Lkw-Flotte-2024").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn strength_rules() {
        assert!(check_strength("kurz", "anna").is_err());
        assert!(check_strength("1234567890", "anna").is_err());
        assert!(check_strength("Password", "anna").is_err());
        assert!(check_strength("anna-2024!", "anna").is_err());
        assert!(check_strength("Lkw-Flotte-2024", "anna").is_ok());
    }

    #[test]
    fn username_match_ignores_case() {
        assert!(check_strength("Disponent#2024", "disponent").is_err());
        assert!(check_strength("Tourplan#2024!", "disponent").is_ok());
    }
}
