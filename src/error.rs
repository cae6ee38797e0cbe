use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Everything a handler can fail with, translated to a status code and the
/// `{ success: false, message }` envelope in one place.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("User already exists, try another email")]
    DuplicateEmail,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("Invalid verification code")]
    InvalidCode,
    #[error("Verification code has expired")]
    CodeExpired,
    #[error("Account is not verified")]
    NotVerified,
    #[error("Password not match, please try again")]
    PasswordMismatch,
    #[error("Current password is incorrect")]
    WrongPassword,
    #[error("Passwords do not match")]
    FieldMismatch,
    #[error("Password must be at least 6 characters long")]
    WeakPassword,
    #[error("New password cannot be same as old password")]
    SamePassword,
    #[error("Invalid or expired reset code")]
    InvalidResetCode,
    #[error("Invalid or expired reset token")]
    InvalidResetToken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidCode
            | ApiError::CodeExpired
            | ApiError::WrongPassword
            | ApiError::FieldMismatch
            | ApiError::WeakPassword
            | ApiError::SamePassword
            | ApiError::InvalidResetCode
            | ApiError::InvalidResetToken => StatusCode::BAD_REQUEST,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated(_) | ApiError::PasswordMismatch => StatusCode::UNAUTHORIZED,
            ApiError::NotVerified => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_map_to_unauthorized() {
        assert_eq!(
            ApiError::PasswordMismatch.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Unauthenticated("Token not found").status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn code_failures_are_distinct_but_both_bad_request() {
        assert_eq!(ApiError::InvalidCode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::CodeExpired.status(), StatusCode::BAD_REQUEST);
        assert_ne!(
            ApiError::InvalidCode.to_string(),
            ApiError::CodeExpired.to_string()
        );
    }

    #[test]
    fn duplicate_email_is_conflict() {
        assert_eq!(ApiError::DuplicateEmail.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unverified_login_is_forbidden() {
        assert_eq!(ApiError::NotVerified.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_errors_hide_the_cause() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
