//! Password hashing and strength policy (§4.3).

use std::collections::HashSet;
use std::sync::OnceLock;

use anyhow::{Context, Result};

pub const BCRYPT_COST: u32 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("password must be at least 12 characters")]
    TooShort,
    #[error("password must contain a lowercase letter, an uppercase letter, a digit, and a symbol")]
    MissingCharacterClass,
    #[error("password is too common")]
    TooCommon,
    #[error("password matches a recently used password")]
    Reused,
}

pub fn hash_password(plaintext: &str) -> Result<String> {
    bcrypt::hash(plaintext, BCRYPT_COST).context("bcrypt hash failed")
}

pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(plaintext, hash).context("bcrypt verify failed")
}

/// Checks length, character-class diversity, and the common-password list.
/// History reuse is checked separately by the caller (it needs DB access to
/// the user's last-N hashes, which this crate-internal policy check does
/// not have).
pub fn check_strength(plaintext: &str) -> Result<(), PasswordPolicyError> {
    if plaintext.chars().count() < 12 {
        return Err(PasswordPolicyError::TooShort);
    }
    let has_lower = plaintext.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = plaintext.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = plaintext.chars().any(|c| c.is_ascii_digit());
    let has_symbol = plaintext.chars().any(|c| !c.is_ascii_alphanumeric());
    if !(has_lower && has_upper && has_digit && has_symbol) {
        return Err(PasswordPolicyError::MissingCharacterClass);
    }
    if common_passwords().contains(plaintext) {
        return Err(PasswordPolicyError::TooCommon);
    }
    Ok(())
}

/// Checks `plaintext` against the last-N password hashes on file for reuse
/// (§4.3: "does not match any hash in the user's last-N password history").
pub fn check_not_reused(plaintext: &str, recent_hashes: &[String]) -> Result<()> {
    for hash in recent_hashes {
        if verify_password(plaintext, hash)? {
            anyhow::bail!(PasswordPolicyError::Reused);
        }
    }
    Ok(())
}

/// Static list of ≥1000 disallowed passwords (§4.3). Loaded once from the
/// bundled wordlist and interned as a set for O(1) membership checks.
fn common_passwords() -> &'static HashSet<&'static str> {
    static LIST: OnceLock<HashSet<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| COMMON_PASSWORDS.iter().copied().collect())
}

include!("common_passwords.rs");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_passwords() {
        assert_eq!(check_strength("Ab1!").unwrap_err(), PasswordPolicyError::TooShort);
    }

    #[test]
    fn rejects_missing_character_class() {
        assert_eq!(
            check_strength("lowercaseonlylong").unwrap_err(),
            PasswordPolicyError::MissingCharacterClass
        );
    }

    #[test]
    fn accepts_strong_password() {
        assert!(check_strength("Correct-Horse9!Battery").is_ok());
    }

    #[test]
    fn common_list_has_required_size() {
        assert!(COMMON_PASSWORDS.len() >= 1000);
    }

    #[test]
    fn hash_round_trips() {
        let hash = hash_password("Correct-Horse9!Battery").unwrap();
        assert!(verify_password("Correct-Horse9!Battery", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
