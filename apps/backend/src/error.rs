use std::error::Error as StdError;
use std::fmt;

use actix_web::http::StatusCode;

use crate::errors::domain::{DomainError, InfraErrorKind};
use crate::errors::ErrorCode;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Message exposed to callers for every internal-classified failure.
pub const INTERNAL_MESSAGE: &str = "internal server error";

/// Classification tag of an `AppError`.
///
/// This is the only dimension used to pick a transport status; the numeric
/// business code is carried separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Timeout,
    Conflict,
    TooLarge,
    Internal,
}

impl ErrorKind {
    /// Fixed status for each classification.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reverse lookup used for errors produced by the transport itself.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::BAD_REQUEST => Some(ErrorKind::BadRequest),
            StatusCode::UNAUTHORIZED => Some(ErrorKind::Unauthorized),
            StatusCode::FORBIDDEN => Some(ErrorKind::Forbidden),
            StatusCode::NOT_FOUND => Some(ErrorKind::NotFound),
            StatusCode::REQUEST_TIMEOUT => Some(ErrorKind::Timeout),
            StatusCode::CONFLICT => Some(ErrorKind::Conflict),
            StatusCode::PAYLOAD_TOO_LARGE => Some(ErrorKind::TooLarge),
            StatusCode::INTERNAL_SERVER_ERROR => Some(ErrorKind::Internal),
            _ => None,
        }
    }

    fn generic_code(self) -> ErrorCode {
        match self {
            ErrorKind::BadRequest => ErrorCode::BadRequest,
            ErrorKind::Unauthorized => ErrorCode::Unauthorized,
            ErrorKind::Forbidden => ErrorCode::Forbidden,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::Timeout => ErrorCode::RequestTimeout,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::TooLarge => ErrorCode::PayloadTooLarge,
            ErrorKind::Internal => ErrorCode::Internal,
        }
    }
}

/// Unified error: a business code, a human message, an optional
/// classification tag and an optional underlying cause.
///
/// The cause is kept for logging only. `public_message` never exposes it.
pub struct AppError {
    message: String,
    code: ErrorCode,
    kind: Option<ErrorKind>,
    source: Option<BoxError>,
}

impl AppError {
    /// An error without a classification tag; it classifies as internal.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            kind: None,
            source: None,
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        self.source = Some(source.into());
        self
    }

    fn classified(kind: ErrorKind, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message).with_kind(kind)
    }

    pub fn bad_request(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::BadRequest, code, message)
    }

    pub fn unauthorized() -> Self {
        Self::classified(
            ErrorKind::Unauthorized,
            ErrorCode::Unauthorized,
            ErrorCode::Unauthorized.default_message(),
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::Forbidden, ErrorCode::Forbidden, message)
    }

    pub fn not_found(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::NotFound, code, message)
    }

    pub fn conflict(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::Conflict, code, message)
    }

    pub fn timeout() -> Self {
        Self::classified(
            ErrorKind::Timeout,
            ErrorCode::RequestTimeout,
            ErrorCode::RequestTimeout.default_message(),
        )
    }

    pub fn too_large() -> Self {
        Self::classified(
            ErrorKind::TooLarge,
            ErrorCode::PayloadTooLarge,
            ErrorCode::PayloadTooLarge.default_message(),
        )
    }

    pub fn internal<E>(code: ErrorCode, message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::classified(ErrorKind::Internal, code, message).with_source(source)
    }

    /// Internal error without an underlying cause.
    pub fn internal_msg(message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::Internal, ErrorCode::Internal, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::classified(ErrorKind::Internal, ErrorCode::ConfigError, message)
    }

    /// Classify a status produced by the transport (e.g. its own 404).
    /// Unmapped statuses become internal.
    pub fn from_status(status: StatusCode) -> Self {
        let kind = ErrorKind::from_status(status).unwrap_or(ErrorKind::Internal);
        let code = kind.generic_code();
        Self::classified(kind, code, code.default_message())
    }

    /// Recover the unified error from an arbitrary error chain.
    ///
    /// Walks `source()` links looking for an `AppError`; an actix error is
    /// classified through its status; anything else is internal with the
    /// original error's text kept as the (non-public) message.
    pub fn classify(err: &(dyn StdError + 'static)) -> Self {
        let mut current: Option<&(dyn StdError + 'static)> = Some(err);
        while let Some(e) = current {
            if let Some(app) = e.downcast_ref::<AppError>() {
                return Self {
                    message: app.message.clone(),
                    code: app.code,
                    kind: app.kind,
                    source: None,
                };
            }
            current = e.source();
        }
        if let Some(actix) = err.downcast_ref::<actix_web::Error>() {
            return Self::from_status(actix.as_response_error().status_code());
        }
        Self::new(ErrorCode::Internal, err.to_string())
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Classification tag; an absent tag is internal.
    pub fn kind(&self) -> ErrorKind {
        self.kind.unwrap_or(ErrorKind::Internal)
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    /// Message safe to put into a response body.
    pub fn public_message(&self) -> &str {
        match self.kind() {
            ErrorKind::Internal => INTERNAL_MESSAGE,
            _ => &self.message,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("message", &self.message)
            .field("code", &self.code.as_u32())
            .field("kind", &self.kind)
            .field("source", &self.source)
            .finish()
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(code, detail) => AppError::bad_request(code, detail),
            DomainError::Conflict(code, detail) => AppError::conflict(code, detail),
            DomainError::NotFound(code, detail) => AppError::not_found(code, detail),
            DomainError::Infra(InfraErrorKind::Timeout, detail) => {
                AppError::timeout().with_source(detail)
            }
            DomainError::Infra(_, detail) => {
                AppError::internal(ErrorCode::DbError, "database error", detail)
            }
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        AppError::from(DomainError::from(e))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::bad_request(ErrorCode::InvalidBody, format!("invalid request body: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use thiserror::Error;

    use super::*;

    #[test]
    fn test_classification_table() {
        let cases = [
            (ErrorKind::BadRequest, 400),
            (ErrorKind::Forbidden, 403),
            (ErrorKind::NotFound, 404),
            (ErrorKind::Internal, 500),
            (ErrorKind::Timeout, 408),
            (ErrorKind::Unauthorized, 401),
            (ErrorKind::Conflict, 409),
            (ErrorKind::TooLarge, 413),
        ];
        for (kind, status) in cases {
            assert_eq!(kind.status().as_u16(), status, "{kind:?}");
            assert_eq!(ErrorKind::from_status(kind.status()), Some(kind));
        }
    }

    #[test]
    fn test_untagged_error_is_internal() {
        let err = AppError::new(ErrorCode::NameEmpty, "Name is empty");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), INTERNAL_MESSAGE);
    }

    #[test]
    fn test_internal_cause_is_not_public() {
        let err = AppError::internal(
            ErrorCode::DbError,
            "insert failed",
            std::io::Error::other("password=hunter2"),
        );
        assert_eq!(err.public_message(), INTERNAL_MESSAGE);
        assert!(err.to_string().contains("hunter2"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_status_maps_transport_errors() {
        let err = AppError::from_status(StatusCode::NOT_FOUND);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = AppError::from_status(StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.kind(), ErrorKind::TooLarge);

        let err = AppError::from_status(StatusCode::IM_A_TEAPOT);
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[derive(Debug, Error)]
    #[error("wrapped")]
    struct Wrapper(#[source] AppError);

    #[test]
    fn test_classify_unwraps_nested_app_error() {
        let inner = AppError::conflict(ErrorCode::DuplicateEntry, "duplicate entry");
        let wrapped = Wrapper(inner);
        let classified = AppError::classify(&wrapped);
        assert_eq!(classified.kind(), ErrorKind::Conflict);
        assert_eq!(classified.code(), ErrorCode::DuplicateEntry);
    }

    #[test]
    fn test_classify_actix_not_found() {
        let actix_err = actix_web::error::ErrorNotFound("no route");
        let classified = AppError::classify(&actix_err);
        assert_eq!(classified.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_classify_foreign_error_is_internal() {
        let io = std::io::Error::other("disk on fire");
        let classified = AppError::classify(&io);
        assert_eq!(classified.kind(), ErrorKind::Internal);
        assert_eq!(classified.public_message(), INTERNAL_MESSAGE);
    }

    #[test]
    fn test_domain_error_mapping() {
        let err: AppError =
            DomainError::not_found(ErrorCode::WardrobeNotFound, "wardrobe missing").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), ErrorCode::WardrobeNotFound);

        let err: AppError =
            DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), ErrorCode::DbError);
    }
}
