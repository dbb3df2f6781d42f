use thiserror::Error;

pub const CURRENT_PASSWORD_INCORRECT_MESSAGE: &str = "Current password is incorrect";

/// Client-side input failures, raised before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("token must not be empty")]
    EmptyToken,
    #[error("tenant id must not be empty")]
    EmptyTenantId,
    #[error("API base URL must be an http(s) address: {value}")]
    InvalidBaseUrl { value: String },
    #[error("New password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("New password and confirmation do not match")]
    PasswordMismatch,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store io failed: {message}")]
    Io { message: String },
    #[error("credential store encode failed: {message}")]
    Encode { message: String },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("base url must not be empty")]
    BaseUrlMissing,
    #[error("request path must not be empty")]
    InvalidPath,
    #[error("Network request failed: {message}")]
    Network { message: String },
    #[error("Request failed ({status})")]
    Http { status: u16, body: String },
    #[error("Expected JSON response ({status})")]
    UnexpectedContentType { status: u16, body: String },
    #[error("Response could not be decoded: {message}")]
    Decode { message: String },
    #[error("{message}")]
    Application { message: String },
    #[error("Response envelope carried no data")]
    MissingData,
    #[error("Invalid login response")]
    InvalidLoginResponse,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Brand response was for tenant {found}, expected {expected}")]
    TenantMismatch { expected: String, found: String },
    #[error("Current password is incorrect")]
    CurrentPasswordIncorrect,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientError {
    /// HTTP status carried by transport-level failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::UnexpectedContentType { status, .. } => Some(*status),
            _ => None,
        }
    }
}
