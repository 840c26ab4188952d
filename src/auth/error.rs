//! Authentication error vocabulary.
//!
//! The identity provider reports failures through a small closed set of
//! error codes. Everything the provider can say is mapped onto this enum
//! so callers branch on a stable vocabulary; each variant carries its
//! user-facing message.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("This email is already registered. Please log in instead.")]
    EmailExists,

    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Password must be at least 6 characters long.")]
    WeakPassword,

    #[error("No account found with this email.")]
    EmailNotFound,

    #[error("Incorrect password or email. Please try again.")]
    InvalidPassword,

    #[error("This account has been disabled.")]
    UserDisabled,

    #[error("Too many failed attempts. Please try again later.")]
    TooManyAttempts,

    #[error("Unable to connect. Please check your internet connection.")]
    Network,

    #[error("An unexpected error occurred. Please try again.")]
    Unknown,
}

impl AuthError {
    /// Map a provider error code onto the closed vocabulary.
    ///
    /// Codes occasionally arrive with a trailing explanation
    /// ("WEAK_PASSWORD : Password should be at least 6 characters"), so
    /// only the leading token is matched.
    pub(crate) fn from_provider_code(code: &str) -> Self {
        let code = code.split(':').next().unwrap_or(code).trim();
        match code {
            "EMAIL_EXISTS" => AuthError::EmailExists,
            "INVALID_EMAIL" => AuthError::InvalidEmail,
            "WEAK_PASSWORD" => AuthError::WeakPassword,
            "EMAIL_NOT_FOUND" => AuthError::EmailNotFound,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => AuthError::InvalidPassword,
            "USER_DISABLED" => AuthError::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
            _ => AuthError::Unknown,
        }
    }
}
