//! Envelope assertions for HTTP tests.
//!
//! Mirrors the wire shape `{data?, code?, message?, error?}` locally so the
//! helpers work without the backend crate.

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBodyLike {
    pub error_code: u32,
    pub error_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeLike {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorBodyLike>,
}

/// Status, headers and parsed body of a test response.
#[derive(Debug)]
pub struct EnvelopeResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: EnvelopeLike,
}

pub async fn read_envelope<B>(resp: ServiceResponse<B>) -> EnvelopeResponse
where
    B: MessageBody,
{
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = actix_web::test::read_body(resp).await;
    let body: EnvelopeLike = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "response body is not an envelope ({e}): {}",
            String::from_utf8_lossy(&bytes)
        )
    });
    EnvelopeResponse {
        status,
        headers,
        body,
    }
}

/// Assert an error envelope: status, `code` parity and the business code.
pub fn assert_error_envelope(resp: &EnvelopeResponse, status: StatusCode, error_code: u32) {
    assert_eq!(resp.status, status, "unexpected status, body: {:?}", resp.body);
    assert_eq!(resp.body.code, status.as_u16(), "code must mirror the status");
    assert!(resp.body.data.is_none(), "error envelope must not carry data");
    let error = resp
        .body
        .error
        .as_ref()
        .unwrap_or_else(|| panic!("missing error object: {:?}", resp.body));
    assert_eq!(error.error_code, error_code);
}

/// Assert a success envelope and return its data.
pub fn assert_success_envelope(resp: &EnvelopeResponse, status: StatusCode) -> serde_json::Value {
    assert_eq!(resp.status, status, "unexpected status, body: {:?}", resp.body);
    assert_eq!(resp.body.code, status.as_u16());
    assert!(resp.body.error.is_none(), "unexpected error: {:?}", resp.body.error);
    resp.body.data.clone().unwrap_or(serde_json::Value::Null)
}
