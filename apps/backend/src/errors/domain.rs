//! Domain-level error type used by repositories and use cases.
//!
//! This error type is HTTP-agnostic. Handlers return
//! `Result<_, crate::error::AppError>` and convert from `DomainError`
//! using the provided `From<DomainError> for AppError` implementation.

use thiserror::Error;
use tracing::warn;

use crate::context::ContextError;
use crate::errors::ErrorCode;

/// Infra error kinds to distinguish operational failures
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InfraErrorKind {
    Timeout,
    DbUnavailable,
    Other(String),
}

/// Central domain error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// Input validation or business rule violation, with the business code to report
    #[error("validation error {0}: {1}")]
    Validation(ErrorCode, String),
    /// Semantic conflict (duplicate key, concurrent update)
    #[error("conflict {0}: {1}")]
    Conflict(ErrorCode, String),
    /// Missing resource in domain terms
    #[error("not found {0}: {1}")]
    NotFound(ErrorCode, String),
    /// Infrastructure/operational failures
    #[error("infra {0:?}: {1}")]
    Infra(InfraErrorKind, String),
}

impl DomainError {
    pub fn validation(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Validation(code, detail.into())
    }
    pub fn conflict(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Conflict(code, detail.into())
    }
    pub fn not_found(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::NotFound(code, detail.into())
    }
    pub fn infra(kind: InfraErrorKind, detail: impl Into<String>) -> Self {
        Self::Infra(kind, detail.into())
    }
}

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

/// Translate a `DbErr` into a `DomainError`.
///
/// Raw driver messages stay in the logs; the domain detail is generic.
pub fn map_db_err(e: sea_orm::DbErr) -> DomainError {
    let error_msg = e.to_string();

    match &e {
        sea_orm::DbErr::RecordNotFound(_) => {
            return DomainError::not_found(ErrorCode::WardrobeNotFound, "Record not found");
        }
        sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
            warn!(raw_error = %error_msg, "Database unavailable");
            return DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable");
        }
        _ => {}
    }

    if mentions_sqlstate(&error_msg, "23505")
        || error_msg.contains("duplicate key value violates unique constraint")
        || error_msg.contains("UNIQUE constraint failed")
    {
        warn!(raw_error = %error_msg, "Unique constraint violation");
        return DomainError::conflict(ErrorCode::DuplicateEntry, "Duplicate entry");
    }

    if mentions_sqlstate(&error_msg, "57014") || error_msg.contains("timeout") {
        warn!(raw_error = %error_msg, "Database statement timed out");
        return DomainError::infra(InfraErrorKind::Timeout, "Database timeout");
    }

    DomainError::infra(InfraErrorKind::Other("DbErr".into()), error_msg)
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        map_db_err(e)
    }
}

impl From<ContextError> for DomainError {
    fn from(e: ContextError) -> Self {
        match e {
            ContextError::DeadlineExceeded => {
                DomainError::infra(InfraErrorKind::Timeout, e.to_string())
            }
            ContextError::Canceled => {
                DomainError::infra(InfraErrorKind::Other("Canceled".into()), e.to_string())
            }
        }
    }
}
