//! Password type with the identity service's minimum length rule.

use core::fmt;

/// Errors that can occur when validating a [`Password`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The password is shorter than [`Password::MIN_LENGTH`].
    #[error("password must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The password and its confirmation differ.
    #[error("passwords do not match")]
    Mismatch,
}

/// A password that satisfies the minimum length rule.
///
/// The inner value is never printed; `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Minimum number of characters.
    pub const MIN_LENGTH: usize = 6;

    /// Validate a password.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::TooShort`] when fewer than six characters.
    pub fn parse(s: &str) -> Result<Self, PasswordError> {
        if s.chars().count() < Self::MIN_LENGTH {
            return Err(PasswordError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Validate a new password against its confirmation field.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::TooShort`] or [`PasswordError::Mismatch`].
    pub fn parse_confirmed(s: &str, confirmation: &str) -> Result<Self, PasswordError> {
        let password = Self::parse(s)?;
        if s != confirmation {
            return Err(PasswordError::Mismatch);
        }
        Ok(password)
    }

    /// Expose the raw password for transmission to the identity service.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_min_length() {
        assert_eq!(
            Password::parse("12345"),
            Err(PasswordError::TooShort { min: 6 })
        );
        assert!(Password::parse("123456").is_ok());
    }

    #[test]
    fn test_confirmation() {
        assert_eq!(
            Password::parse_confirmed("secret-1", "secret-2"),
            Err(PasswordError::Mismatch)
        );
        assert!(Password::parse_confirmed("secret-1", "secret-1").is_ok());
    }

    #[test]
    fn test_length_checked_before_mismatch() {
        assert_eq!(
            Password::parse_confirmed("abc", "xyz"),
            Err(PasswordError::TooShort { min: 6 })
        );
    }

    #[test]
    fn test_redacted() {
        let password = Password::parse("hunter22").unwrap();
        assert_eq!(format!("{password:?}"), "Password([REDACTED])");
        assert!(!password.to_string().contains("hunter"));
    }
}
