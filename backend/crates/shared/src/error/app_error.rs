//! Application Error - Unified error envelope for the application
//!
//! Defines [`AppError`] struct and [`AppResult<T>`] type alias.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use super::kind::ErrorKind;

/// Name of the JSON field carrying the human-readable text
///
/// Authentication failures report their text under `msg`, every other
/// domain error under `message`. Clients depend on both spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKey {
    #[default]
    Message,
    Msg,
}

impl MessageKey {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageKey::Message => "message",
            MessageKey::Msg => "msg",
        }
    }
}

/// Unified application error
///
/// Built with a builder-style API.
///
/// ## Fields
/// * `kind` - classification (mapped to the HTTP status)
/// * `code` - numeric domain code reported to clients, if any
/// * `message` - user-facing text
/// * `message_key` - JSON field name for `message`
/// * `source` - underlying error, kept for logs only
///
/// ## Examples
/// ```rust
/// use kernel::error::app_error::{AppError, MessageKey};
/// use kernel::error::kind::ErrorKind;
///
/// let err = AppError::not_found("User with such id doesn't exist").with_code(8);
/// assert_eq!(err.code(), Some(8));
///
/// let err = AppError::new(ErrorKind::Forbidden, "only admins can access this info")
///     .with_code(10)
///     .with_message_key(MessageKey::Msg);
/// assert_eq!(err.message_key(), MessageKey::Msg);
/// ```
pub struct AppError {
    kind: ErrorKind,
    code: Option<u16>,
    message: Cow<'static, str>,
    message_key: MessageKey,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

/// `Result<T, AppError>`
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    // ========================================================================
    // Constructors
    // ========================================================================

    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            message_key: MessageKey::default(),
            source: None,
        }
    }

    #[inline]
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    #[inline]
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    #[inline]
    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    #[inline]
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InternalServerError, message)
    }

    #[inline]
    pub fn service_unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Attach the numeric domain code reported in the response body
    #[inline]
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Choose the JSON field name that carries the message
    #[inline]
    pub fn with_message_key(mut self, key: MessageKey) -> Self {
        self.message_key = key;
        self
    }

    /// Keep the underlying error for diagnostics
    ///
    /// ```rust
    /// use kernel::error::app_error::{AppError, AppResult};
    ///
    /// fn parse_port(raw: &str) -> AppResult<u16> {
    ///     raw.parse()
    ///         .map_err(|e| AppError::bad_request("Invalid port").with_source(e))
    /// }
    /// assert!(parse_port("http").is_err());
    /// ```
    #[inline]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    #[inline]
    pub fn code(&self) -> Option<u16> {
        self.code
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn message_key(&self) -> MessageKey {
        self.message_key
    }

    #[inline]
    pub fn is_server_error(&self) -> bool {
        self.kind.is_server_error()
    }

    /// JSON body for this error
    ///
    /// Errors carrying a domain code render as `{"code": .., "message": ..}`
    /// (or `msg`). Errors without one render as an RFC 7807 problem document.
    pub fn to_body(&self) -> serde_json::Value {
        match self.code {
            Some(code) => {
                let mut body = serde_json::Map::new();
                body.insert("code".to_string(), code.into());
                body.insert(
                    self.message_key.as_str().to_string(),
                    self.message().into(),
                );
                serde_json::Value::Object(body)
            }
            None => serde_json::json!({
                "type": format!("https://httpstatuses.io/{}", self.status_code()),
                "title": self.kind.as_str(),
                "status": self.status_code(),
                "detail": self.message(),
            }),
        }
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("AppError");
        builder.field("kind", &self.kind);
        if let Some(code) = &self.code {
            builder.field("code", code);
        }
        builder.field("message", &self.message);
        if let Some(source) = &self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.code {
            write!(f, " (code {})", code)?;
        }
        Ok(())
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}
