//! Directory Error Types
//!
//! Directory-specific error variants that integrate with the unified
//! `kernel::error::AppError` system. Validation failures bypass `AppError`
//! because they use their own `{"detail": [...]}` envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{
    app_error::{AppError, MessageKey},
    kind::ErrorKind,
};
use kernel::id::UserId;
use serde_json::json;
use thiserror::Error;

use crate::application::validator::FieldErrors;

/// Directory-specific result type alias
pub type DirectoryResult<T> = Result<T, DirectoryError>;

pub const MSG_BAD_BODY: &str = "incorrect data format. application/json expected";
pub const MSG_NO_PAGE_PARAMS: &str = "no page or size parameter in request";
pub const MSG_BAD_PAGE_PARAMS: &str = "page and size must be positive integers";

/// Directory-specific error variants
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No session cookie on the request
    #[error("no cookie to recognise session was specified")]
    NoToken,

    /// Session token does not name an existing user
    #[error("user with such cookie bounding doesn't exist")]
    UnknownSession,

    /// Caller is not an administrator
    #[error("only admins can access this info")]
    Forbidden,

    /// Caller tried to modify another user through the self-service tier
    #[error("This user cannot modify user with id {0} if this user admin, he must use private mode")]
    NotOwner(UserId),

    /// Target user id does not exist
    #[error("User with such id doesn't exist")]
    UserNotFound,

    /// Page window starts past the end of the collection
    #[error("no such page")]
    NoSuchPage,

    /// Login names no known email
    #[error("User with such login doesn't exist")]
    UnknownLogin,

    /// Password does not match the stored hash
    #[error("Incorrect password for such user")]
    WrongPassword,

    /// Body is not a JSON object
    #[error("incorrect data format. application/json expected")]
    ParamsParse { loc: &'static str },

    /// One or more payload fields failed validation
    #[error("payload validation failed at {loc}")]
    UserValidation {
        loc: &'static str,
        msg: serde_json::Value,
    },

    /// Listing query parameters missing or malformed
    #[error("{msg}")]
    PageParams {
        loc: &'static str,
        msg: &'static str,
    },

    /// Field conflicts found by the store layer (taken email, unknown city)
    ///
    /// Handlers attach their location with [`DirectoryError::at`].
    #[error("field conflict")]
    FieldConflict(FieldErrors),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DirectoryError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DirectoryError::NoToken | DirectoryError::UnknownSession => StatusCode::UNAUTHORIZED,
            DirectoryError::Forbidden => StatusCode::FORBIDDEN,
            DirectoryError::UserNotFound => StatusCode::NOT_FOUND,
            DirectoryError::NotOwner(_)
            | DirectoryError::NoSuchPage
            | DirectoryError::UnknownLogin
            | DirectoryError::WrongPassword => StatusCode::BAD_REQUEST,
            DirectoryError::ParamsParse { .. }
            | DirectoryError::UserValidation { .. }
            | DirectoryError::PageParams { .. }
            | DirectoryError::FieldConflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DirectoryError::Database(_) | DirectoryError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DirectoryError::NoToken | DirectoryError::UnknownSession => ErrorKind::Unauthorized,
            DirectoryError::Forbidden => ErrorKind::Forbidden,
            DirectoryError::UserNotFound => ErrorKind::NotFound,
            DirectoryError::NotOwner(_)
            | DirectoryError::NoSuchPage
            | DirectoryError::UnknownLogin
            | DirectoryError::WrongPassword => ErrorKind::BadRequest,
            DirectoryError::ParamsParse { .. }
            | DirectoryError::UserValidation { .. }
            | DirectoryError::PageParams { .. }
            | DirectoryError::FieldConflict(_) => ErrorKind::UnprocessableEntity,
            DirectoryError::Database(_) | DirectoryError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Numeric code reported to clients
    pub fn code(&self) -> Option<u16> {
        match self {
            DirectoryError::UnknownLogin => Some(1),
            DirectoryError::WrongPassword => Some(2),
            DirectoryError::NoSuchPage => Some(3),
            DirectoryError::NoToken => Some(4),
            DirectoryError::UnknownSession => Some(5),
            DirectoryError::NotOwner(_) => Some(7),
            DirectoryError::UserNotFound => Some(8),
            DirectoryError::Forbidden => Some(10),
            _ => None,
        }
    }

    /// Attach the handler location to a store-level field conflict
    pub fn at(self, loc: &'static str) -> Self {
        match self {
            DirectoryError::FieldConflict(errors) => DirectoryError::UserValidation {
                loc,
                msg: errors.to_value(),
            },
            other => other,
        }
    }

    /// Convert to AppError
    pub fn into_app_error(self) -> AppError {
        let kind = self.kind();
        let code = self.code();
        let message_key = match self {
            DirectoryError::NoToken | DirectoryError::UnknownSession | DirectoryError::Forbidden => {
                MessageKey::Msg
            }
            _ => MessageKey::Message,
        };

        match self {
            DirectoryError::Database(e) => AppError::from(e),
            DirectoryError::Internal(_) => AppError::internal("Internal server error"),
            other => {
                let err = AppError::new(kind, other.to_string()).with_message_key(message_key);
                match code {
                    Some(code) => err.with_code(code),
                    None => err,
                }
            }
        }
    }

    /// `{"detail": [...]}` envelope for validation failures
    fn detail_body(&self) -> Option<serde_json::Value> {
        let (loc, msg, kind) = match self {
            DirectoryError::ParamsParse { loc } => (*loc, json!(MSG_BAD_BODY), "ParamsParseError"),
            DirectoryError::UserValidation { loc, msg } => {
                (*loc, msg.clone(), "UserValidationError")
            }
            DirectoryError::PageParams { loc, msg } => (*loc, json!(msg), "PageParamsValidation"),
            DirectoryError::FieldConflict(errors) => ("", errors.to_value(), "UserValidationError"),
            _ => return None,
        };

        let loc = if loc.is_empty() { json!([]) } else { json!([loc]) };

        Some(json!({
            "detail": [{
                "loc": loc,
                "msg": msg,
                "type": kind,
            }]
        }))
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            DirectoryError::Database(e) => {
                tracing::error!(error = %e, "Directory database error");
            }
            DirectoryError::Internal(msg) => {
                tracing::error!(message = %msg, "Directory internal error");
            }
            DirectoryError::UnknownLogin | DirectoryError::WrongPassword => {
                tracing::warn!(reason = %self, "Failed login attempt");
            }
            DirectoryError::UnknownSession => {
                tracing::warn!("Session token did not resolve to a user");
            }
            _ => {
                tracing::debug!(error = %self, "Directory error");
            }
        }
    }
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        self.log();

        if let Some(body) = self.detail_body() {
            return (self.status_code(), Json(body)).into_response();
        }

        self.into_app_error().into_response()
    }
}

impl From<AppError> for DirectoryError {
    fn from(err: AppError) -> Self {
        DirectoryError::Internal(err.to_string())
    }
}
