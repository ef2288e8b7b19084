//! User-facing authentication errors

use serde::Serialize;

use super::provider::{codes, ProviderError};

/// Closed set of failures shown to the user. `Display` is the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum AuthError {
    #[error("This email is already registered. Try signing in.")]
    EmailInUse,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Password must be at least 6 characters.")]
    WeakPassword,
    #[error("No account found with this email.")]
    UserNotFound,
    #[error("Incorrect password. Please try again.")]
    WrongPassword,
    #[error("Invalid email or password.")]
    InvalidCredential,
    #[error("Too many attempts. Please wait a moment and try again.")]
    TooManyRequests,
    #[error("Something went wrong. Please try again.")]
    Unknown,
}

impl AuthError {
    pub fn from_code(code: &str) -> Self {
        match code {
            codes::EMAIL_ALREADY_IN_USE => AuthError::EmailInUse,
            codes::INVALID_EMAIL => AuthError::InvalidEmail,
            codes::WEAK_PASSWORD => AuthError::WeakPassword,
            codes::USER_NOT_FOUND => AuthError::UserNotFound,
            codes::WRONG_PASSWORD => AuthError::WrongPassword,
            codes::INVALID_CREDENTIAL => AuthError::InvalidCredential,
            codes::TOO_MANY_REQUESTS => AuthError::TooManyRequests,
            _ => AuthError::Unknown,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        AuthError::from_code(&err.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_to_messages() {
        let cases = [
            (codes::EMAIL_ALREADY_IN_USE, "This email is already registered. Try signing in."),
            (codes::INVALID_EMAIL, "Please enter a valid email address."),
            (codes::WEAK_PASSWORD, "Password must be at least 6 characters."),
            (codes::USER_NOT_FOUND, "No account found with this email."),
            (codes::WRONG_PASSWORD, "Incorrect password. Please try again."),
            (codes::INVALID_CREDENTIAL, "Invalid email or password."),
            (codes::TOO_MANY_REQUESTS, "Too many attempts. Please wait a moment and try again."),
        ];
        for (code, message) in cases {
            assert_eq!(AuthError::from_code(code).message(), message, "code {}", code);
        }
    }

    #[test]
    fn test_unknown_code_is_generic() {
        let err: AuthError = ProviderError::new("auth/network-request-failed", "socket closed").into();
        assert_eq!(err, AuthError::Unknown);
        assert_eq!(err.to_string(), "Something went wrong. Please try again.");
    }
}
