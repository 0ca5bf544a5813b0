use std::collections::HashMap;

use actix_web::http::Method;
use actix_web::HttpRequest;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::errors::ErrorCode;

/// Read-only view of an inbound call handed to handlers.
///
/// Owned and `Send`, so it can move onto the worker task. Header names are
/// stored lower-cased and looked up case-insensitively.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: Bytes,
}

fn or_default(value: Option<&String>, default: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.clone(),
        _ => default.to_string(),
    }
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Decode `a=1&b=x%20y` pair by pair. Undecodable pairs are skipped and the
/// first value of a repeated key wins.
fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut query = HashMap::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let (Some(key), Some(value)) = (decode_component(key), decode_component(value)) else {
            continue;
        };
        query.entry(key).or_insert(value);
    }
    query
}

impl Request {
    pub fn from_http(req: &HttpRequest, body: Bytes) -> Self {
        let params = req
            .match_info()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let query = parse_query(req.query_string());

        let mut headers = HashMap::new();
        for (name, value) in req.headers() {
            if let Ok(v) = value.to_str() {
                headers
                    .entry(name.as_str().to_ascii_lowercase())
                    .or_insert_with(|| v.to_string());
            }
        }

        Self {
            method: req.method().clone(),
            path: req.path().to_string(),
            params,
            query,
            headers,
            body,
        }
    }

    /// Builder used by tests and internal callers that have no `HttpRequest`.
    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            inner: Self {
                method,
                path: path.into(),
                params: HashMap::new(),
                query: HashMap::new(),
                headers: HashMap::new(),
                body: Bytes::new(),
            },
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path parameter; empty when absent.
    pub fn param(&self, key: &str) -> String {
        self.param_or(key, "")
    }

    pub fn param_or(&self, key: &str, default: &str) -> String {
        or_default(self.params.get(key), default)
    }

    pub fn query(&self, key: &str) -> String {
        self.query_or(key, "")
    }

    pub fn query_or(&self, key: &str, default: &str) -> String {
        or_default(self.query.get(key), default)
    }

    pub fn header(&self, key: &str) -> String {
        self.header_or(key, "")
    }

    pub fn header_or(&self, key: &str, default: &str) -> String {
        or_default(self.headers.get(&key.to_ascii_lowercase()), default)
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            AppError::bad_request(ErrorCode::InvalidBody, ErrorCode::InvalidBody.default_message())
                .with_source(e)
        })
    }
}

pub struct RequestBuilder {
    inner: Request,
}

impl RequestBuilder {
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.inner.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.inner.query.insert(key.to_string(), value.to_string());
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.inner
            .headers
            .insert(key.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.inner.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use serde::Deserialize;

    use super::*;

    #[test]
    fn test_defaults_apply_to_missing_and_empty_values() {
        let req = Request::builder(Method::GET, "/v1/wardrobe")
            .query("color", "")
            .build();
        assert_eq!(req.query_or("color", "red"), "red");
        assert_eq!(req.query_or("size", "M"), "M");
        assert_eq!(req.param("id"), "");
    }

    #[test]
    fn test_from_http_collects_query_and_headers() {
        let http = TestRequest::get()
            .uri("/v1/wardrobe/search?color=blue&size=L")
            .insert_header(("X-Client", "mobile"))
            .to_http_request();
        let req = Request::from_http(&http, Bytes::new());
        assert_eq!(req.query("color"), "blue");
        assert_eq!(req.query("size"), "L");
        assert_eq!(req.header("x-client"), "mobile");
        assert_eq!(req.header("X-CLIENT"), "mobile");
        assert_eq!(req.path(), "/v1/wardrobe/search");
    }

    #[test]
    fn test_bad_query_pair_keeps_the_others() {
        let http = TestRequest::get()
            .uri("/v1/wardrobe/search?size=%FF&color=navy%20blue&fit=slim+cut&color=red&flag")
            .to_http_request();
        let req = Request::from_http(&http, Bytes::new());
        assert_eq!(req.query_or("size", "none"), "none");
        assert_eq!(req.query("color"), "navy blue");
        assert_eq!(req.query("fit"), "slim cut");
        assert_eq!(req.query_or("flag", "unset"), "unset");
    }

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
    }

    #[test]
    fn test_json_body() {
        let req = Request::builder(Method::POST, "/")
            .body(r#"{"name":"coat"}"#)
            .build();
        let p: Payload = req.json().unwrap();
        assert_eq!(p.name, "coat");

        let bad = Request::builder(Method::POST, "/").body("{").build();
        let err = bad.json::<Payload>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidBody);
        assert_eq!(err.status().as_u16(), 400);
    }
}
