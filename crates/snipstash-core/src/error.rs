// Error currency for the workspace.
//
// Two layers: `ApiError` is what handlers hand to the response envelope
// (status, machine-readable code, message), `SnipstashError` is everything
// underneath. Codes and their default messages are declared together so
// they cannot drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! error_codes {
    ($($variant:ident => $message:literal),* $(,)?) => {
        /// Machine-readable codes surfaced in error envelopes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum ErrorCode {
            $($variant,)*
        }

        impl ErrorCode {
            /// The default human-readable message for this code.
            pub fn message(&self) -> &'static str {
                match self {
                    $(Self::$variant => $message,)*
                }
            }
        }
    };
}

error_codes! {
    Unauthorized => "Unauthorized",
    ProjectNotFound => "Project not found",
    SnippetNotFound => "Snippet not found",
    PostNotFound => "Community post not found",
    SubscriptionNotFound => "Subscription not found",
    NotSnippetOwner => "You are not the owner of this snippet",
    ProjectLimitReached => "Project limit reached for your plan",
    SnippetLimitReached => "Snippet limit reached for this project",
    ValidationFailed => "Validation failed",
    MissingPriceId => "Price id is required",
    FailedToCreateCheckoutSession => "Failed to create checkout session",
    InvalidWebhookSignature => "Invalid webhook signature",
    CouldNotParseBody => "Could not parse body",
    InternalServerError => "Internal server error",
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The statuses handlers actually respond with on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    InternalServerError = 500,
}

impl HttpStatus {
    pub fn status_code(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_code())
    }
}

/// What a failed request reports back.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status} {code}: {message}")]
pub struct ApiError {
    pub status: HttpStatus,
    pub code: ErrorCode,
    pub message: String,
}

macro_rules! status_shorthand {
    ($($name:ident => $status:ident),* $(,)?) => {
        $(
            pub fn $name(code: ErrorCode) -> Self {
                Self::new(HttpStatus::$status, code)
            }
        )*
    };
}

impl ApiError {
    /// An error carrying the code's default message.
    pub fn new(status: HttpStatus, code: ErrorCode) -> Self {
        Self {
            status,
            code,
            message: code.message().to_string(),
        }
    }

    /// An error with a caller-supplied message.
    pub fn with_message(status: HttpStatus, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    // bad_request(code), unauthorized(code), and so on
    status_shorthand! {
        bad_request => BadRequest,
        unauthorized => Unauthorized,
        forbidden => Forbidden,
        not_found => NotFound,
        internal => InternalServerError,
    }
}

/// Faults below the HTTP surface. `Api` and `Anyhow` exist so both halves
/// convert into the workspace error with `?`.
#[derive(Debug, thiserror::Error)]
pub enum SnipstashError {
    #[error("Storage error: {0}")]
    Database(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_serialize_screaming_snake() {
        let json = serde_json::to_value(ErrorCode::ProjectLimitReached).unwrap();
        assert_eq!(json, serde_json::json!("PROJECT_LIMIT_REACHED"));
        let json = serde_json::to_value(ErrorCode::InvalidWebhookSignature).unwrap();
        assert_eq!(json, serde_json::json!("INVALID_WEBHOOK_SIGNATURE"));
    }

    #[test]
    fn test_status_numbers() {
        assert_eq!(HttpStatus::BadRequest.status_code(), 400);
        assert_eq!(HttpStatus::InternalServerError.status_code(), 500);
    }

    #[test]
    fn test_new_fills_default_message() {
        let err = ApiError::not_found(ErrorCode::SnippetNotFound);
        assert_eq!(err.status, HttpStatus::NotFound);
        assert_eq!(err.message, "Snippet not found");
    }

    #[test]
    fn test_with_message_overrides() {
        let err = ApiError::with_message(
            HttpStatus::Forbidden,
            ErrorCode::ProjectLimitReached,
            "3 of 3 projects used",
        );
        assert_eq!(err.code, ErrorCode::ProjectLimitReached);
        assert_eq!(err.message, "3 of 3 projects used");
    }

    #[test]
    fn test_anyhow_wraps_into_workspace_error() {
        fn fallible() -> Result<(), SnipstashError> {
            Err(anyhow::anyhow!("disk on fire"))?;
            Ok(())
        }
        let err = fallible().unwrap_err();
        assert!(matches!(err, SnipstashError::Anyhow(_)));
        assert_eq!(err.to_string(), "disk on fire");
    }
}
