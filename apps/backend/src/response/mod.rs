//! Uniform JSON response envelope.
//!
//! Every endpoint answers with `{data?, code?, message?, error?}`. The HTTP
//! status always equals `code`.

use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{AppError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_code: u32,
    pub error_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Default for JsonResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonResponse {
    pub fn new() -> Self {
        Self {
            data: None,
            code: StatusCode::OK.as_u16(),
            message: None,
            error: None,
        }
    }

    /// Serialize `data` into the envelope. A value that cannot be
    /// represented as JSON turns the envelope into an internal error.
    pub fn set_data<T: Serialize>(mut self, data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => {
                self.data = Some(value);
                self
            }
            Err(e) => {
                error!(error = %e, "failed to serialize response data");
                self.set_error(&AppError::internal_msg("failed to serialize response data"))
            }
        }
    }

    pub fn set_code(mut self, code: StatusCode) -> Self {
        self.code = code.as_u16();
        self
    }

    pub fn set_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Classify `err` and attach its public part. Last write wins over data.
    pub fn set_error(mut self, err: &AppError) -> Self {
        self.code = err.status().as_u16();
        self.error = Some(ErrorBody {
            error_code: err.code().as_u32(),
            error_message: err.public_message().to_string(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn send(&self) -> HttpResponse {
        match serde_json::to_vec(self) {
            Ok(body) => HttpResponse::build(self.status())
                .insert_header((
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                ))
                .body(body),
            Err(e) => {
                error!(error = %e, "[JsonResponse::send] error encoding response");
                HttpResponse::InternalServerError().finish()
            }
        }
    }
}

/// Error envelope for a use-case failure.
///
/// Classified errors keep their own message; internal ones are logged here
/// and answered with the generic message.
pub fn custom_error_response(err: &AppError) -> JsonResponse {
    if err.kind() == ErrorKind::Internal {
        error!(error = %err, code = %err.code(), "use case failed");
    }
    JsonResponse::new().set_error(err)
}
