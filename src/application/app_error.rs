use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid Google token")]
    InvalidGoogleToken,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Not enough credits (available: {available})")]
    InsufficientCredits { available: i64 },

    /// Per-identity lock could not be acquired within the bounded wait.
    /// Retryable; maps to 503 so callers can distinguish it from a
    /// permanent denial.
    #[error("Busy, please retry")]
    LockTimeout,

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidCredentials,
    InvalidGoogleToken,
    InvalidInput,
    DuplicateEmail,
    InsufficientCredits,
    LockTimeout,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidGoogleToken => "INVALID_GOOGLE_TOKEN",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::DuplicateEmail => "DUPLICATE_EMAIL",
            ErrorCode::InsufficientCredits => "INSUFFICIENT_CREDITS",
            ErrorCode::LockTimeout => "LOCK_TIMEOUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
