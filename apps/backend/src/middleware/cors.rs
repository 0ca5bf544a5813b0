use actix_cors::Cors;
use actix_web::http::header;
use actix_web::http::Method;

/// CORS policy applied by the router when serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<Method>,
    pub allow_headers: Vec<header::HeaderName>,
    pub allow_credentials: bool,
    pub expose_headers: Vec<header::HeaderName>,
    pub max_age: usize,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            allow_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allow_headers: vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT],
            allow_credentials: false,
            expose_headers: vec![header::HeaderName::from_static("x-request-id")],
            max_age: 3600,
        }
    }
}

impl CorsConfig {
    /// Parse a comma separated origin list, e.g. from `CORS_ALLOWED_ORIGINS`.
    ///
    /// Empty entries, `null` and anything that is not http(s) are ignored;
    /// when nothing valid remains the localhost defaults are kept.
    pub fn with_origins(mut self, raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "null")
            .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
            .map(str::to_string)
            .collect();
        if !origins.is_empty() {
            self.allow_origins = origins;
        }
        self
    }
}

pub fn cors_middleware(config: &CorsConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(config.allow_methods.clone())
        .allowed_headers(config.allow_headers.clone())
        .expose_headers(config.expose_headers.clone())
        .max_age(config.max_age);

    if config.allow_credentials {
        cors = cors.supports_credentials();
    }

    for origin in &config.allow_origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}
