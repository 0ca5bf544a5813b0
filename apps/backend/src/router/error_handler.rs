use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse};
use tracing::error;

use crate::error::AppError;
use crate::response::JsonResponse;

/// Turns a classified failure into the response sent to the caller.
pub type ErrorHandler = Arc<dyn Fn(&HttpRequest, &AppError) -> HttpResponse + Send + Sync>;

/// Default handler: log with the request path, answer with the error envelope.
pub fn global_error_handler(req: &HttpRequest, err: &AppError) -> HttpResponse {
    error!(
        error = %err,
        code = %err.code(),
        path = %req.path(),
        "[router.global_error_handler] processing error"
    );
    JsonResponse::new().set_error(err).send()
}

pub fn default_error_handler() -> ErrorHandler {
    Arc::new(global_error_handler)
}
