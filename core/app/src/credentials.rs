//! Client-side checks on new passwords.
//!
//! The service enforces the same rules; checking first avoids a round trip
//! and gives one combined message instead of one rule at a time.

use thiserror::Error;

use lockerbox_common::SensitiveString;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Why a new password was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Passwords do not match")]
    Mismatch,

    #[error(
        "Your password must be at least 8 characters long and contain a lowercase character, \
         an uppercase character, a number and a special character"
    )]
    Weak,
}

/// Symbols accepted as the special character: ASCII `!` to `/`, `:` to `@`
/// and `[` to `_`.
fn is_special(c: char) -> bool {
    matches!(c, '!'..='/' | ':'..='@' | '['..='_')
}

/// Check a new password against its confirmation and the strength rules.
pub fn check_new_password(
    password: &SensitiveString,
    confirm: &SensitiveString,
) -> Result<(), CredentialError> {
    let password = password.expose();
    if password != confirm.expose() {
        return Err(CredentialError::Mismatch);
    }

    let strong = password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(is_special);

    if strong {
        Ok(())
    } else {
        Err(CredentialError::Weak)
    }
}
