//! Request dispatch engine.
//!
//! Routes are declared on a `Router` and mounted onto actix-web. Every call
//! runs the same algorithm:
//!
//! 1. resolve the effective timeout (route override, else router default);
//! 2. derive a deadline-bound `Context`, released on every exit path;
//! 3. build the immutable `Request` view;
//! 4. run the handler on its own task, reporting on a fresh oneshot channel;
//! 5. race the channel against the context finishing;
//! 6. emit exactly one envelope.
//!
//! A timed-out worker is abandoned; it keeps the derived context and is
//! expected to stop at its next cancellation-aware await.

pub mod error_handler;
pub mod handler;
pub mod options;
pub mod panic;
pub mod request;

use std::sync::Arc;
use std::time::Duration;

use actix_web::error::PayloadError;
use actix_web::http::Method;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use parking_lot::RwLock;
use tokio::sync::oneshot;
use tracing::{debug, info, warn, Instrument, Span};

pub use error_handler::{default_error_handler, global_error_handler, ErrorHandler};
pub use handler::{CustomHandler, Handler, HandlerResult};
pub use options::{must_authorized, with_timeout, RouteOption, RouteSettings};
pub use request::Request;

use crate::context::{Context, ContextError};
use crate::error::AppError;
use crate::middleware::{
    cors_middleware, CorsConfig, RequestId, RequestTrace, StructuredLogger, TraceSpan,
};
use crate::trace_ctx;
use handler::{boxed, boxed_custom, BoxedCustomHandler, BoxedHandler};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PORT: u16 = 7000;
pub const DEFAULT_BODY_LIMIT: usize = 4 * 1024 * 1024;

#[derive(Clone)]
pub struct RouterOptions {
    pub prefix: String,
    pub host: String,
    pub port: u16,
    /// Time allowed for the client to send request headers.
    pub read_timeout: Option<Duration>,
    /// Time allowed for the client to disconnect after the response.
    pub write_timeout: Option<Duration>,
    pub request_timeout: Duration,
    pub body_limit: usize,
    pub error_handler: Option<ErrorHandler>,
    pub cors: Option<CorsConfig>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            read_timeout: None,
            write_timeout: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            body_limit: DEFAULT_BODY_LIMIT,
            error_handler: None,
            cors: None,
        }
    }
}

#[derive(Clone)]
enum Endpoint {
    Json(BoxedHandler),
    Custom(BoxedCustomHandler),
}

struct Route {
    method: Method,
    path: String,
    endpoint: Endpoint,
    settings: RouteSettings,
    timeout: Duration,
    body_limit: usize,
    error_handler: ErrorHandler,
}

type RouteTable = Arc<RwLock<Vec<Arc<Route>>>>;

/// Route registry plus the defaults applied to routes registered on it.
///
/// Clones and groups share one route table.
#[derive(Clone)]
pub struct Router {
    options: RouterOptions,
    error_handler: ErrorHandler,
    routes: RouteTable,
}

impl Router {
    pub fn new(mut options: RouterOptions) -> Self {
        if options.request_timeout.is_zero() {
            options.request_timeout = DEFAULT_REQUEST_TIMEOUT;
        }
        if options.port == 0 {
            options.port = DEFAULT_PORT;
        }
        if options.body_limit == 0 {
            options.body_limit = DEFAULT_BODY_LIMIT;
        }
        let error_handler = options
            .error_handler
            .clone()
            .unwrap_or_else(default_error_handler);
        Self {
            options,
            error_handler,
            routes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Register a JSON route at `prefix + path`.
    pub fn handle<H: Handler>(
        &self,
        method: Method,
        path: &str,
        handler: H,
        options: &[RouteOption],
    ) {
        self.add(method, path, Endpoint::Json(boxed(handler)), options);
    }

    pub fn get<H: Handler>(&self, path: &str, handler: H, options: &[RouteOption]) {
        self.handle(Method::GET, path, handler, options);
    }

    pub fn post<H: Handler>(&self, path: &str, handler: H, options: &[RouteOption]) {
        self.handle(Method::POST, path, handler, options);
    }

    pub fn put<H: Handler>(&self, path: &str, handler: H, options: &[RouteOption]) {
        self.handle(Method::PUT, path, handler, options);
    }

    pub fn patch<H: Handler>(&self, path: &str, handler: H, options: &[RouteOption]) {
        self.handle(Method::PATCH, path, handler, options);
    }

    pub fn delete<H: Handler>(&self, path: &str, handler: H, options: &[RouteOption]) {
        self.handle(Method::DELETE, path, handler, options);
    }

    /// Register a raw handler that writes its own response. It still runs
    /// under the route deadline and panic containment.
    pub fn custom_handler<H: CustomHandler>(
        &self,
        method: Method,
        path: &str,
        handler: H,
        options: &[RouteOption],
    ) {
        self.add(method, path, Endpoint::Custom(boxed_custom(handler)), options);
    }

    /// Scoped sub-router: shares the route table, concatenates the prefix and
    /// inherits timeout and error handler.
    pub fn group<F>(&self, prefix: &str, f: F)
    where
        F: FnOnce(&Router),
    {
        let mut options = self.options.clone();
        options.prefix = format!("{}{}", self.options.prefix, prefix);
        let sub = Router {
            options,
            error_handler: self.error_handler.clone(),
            routes: Arc::clone(&self.routes),
        };
        f(&sub);
    }

    fn add(&self, method: Method, path: &str, endpoint: Endpoint, options: &[RouteOption]) {
        let settings = RouteSettings::resolve(options);
        let full_path = format!("{}{}", self.options.prefix, path);
        debug!(method = %method, path = %full_path, "route registered");
        self.routes.write().push(Arc::new(Route {
            method,
            path: full_path,
            timeout: settings.effective_timeout(self.options.request_timeout),
            endpoint,
            settings,
            body_limit: self.options.body_limit,
            error_handler: self.error_handler.clone(),
        }));
    }

    /// Full paths in registration order, e.g. `GET /v1/wardrobe/{id}`.
    pub fn route_list(&self) -> Vec<String> {
        self.routes
            .read()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    /// Mount every registered route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        for route in self.routes.read().iter() {
            let route = Arc::clone(route);
            let method = route.method.clone();
            let path = route.path.clone();
            cfg.route(
                &path,
                web::method(method).to(move |req: HttpRequest, payload: web::Payload| {
                    let route = Arc::clone(&route);
                    async move { dispatch(route, req, payload).await }
                }),
            );
        }
    }

    /// `configure` plus a JSON not-found fallback.
    pub fn app_config(&self, cfg: &mut web::ServiceConfig) {
        self.configure(cfg);
        let error_handler = self.error_handler.clone();
        cfg.default_service(web::to(move |req: HttpRequest| {
            let error_handler = error_handler.clone();
            async move {
                let err = AppError::from_status(actix_web::http::StatusCode::NOT_FOUND);
                error_handler(&req, &err)
            }
        }));
    }

    /// Bind and run the HTTP server until shutdown.
    pub async fn serve(self) -> std::io::Result<()> {
        let host = self.options.host.clone();
        let port = self.options.port;
        let read_timeout = self.options.read_timeout;
        let write_timeout = self.options.write_timeout;
        let cors = self.options.cors.clone().unwrap_or_default();

        info!(host = %host, port, routes = self.routes.read().len(), "starting http server");

        let router = self;
        let mut server = HttpServer::new(move || {
            let router = router.clone();
            App::new()
                .wrap(cors_middleware(&cors))
                .wrap(StructuredLogger)
                .wrap(TraceSpan)
                .wrap(RequestTrace)
                .configure(move |cfg| router.app_config(cfg))
        });
        if let Some(t) = read_timeout {
            server = server.client_request_timeout(t);
        }
        if let Some(t) = write_timeout {
            server = server.client_disconnect_timeout(t);
        }
        server.bind((host.as_str(), port))?.run().await
    }
}

/// Classify a transport failure while streaming the body (overflow → 413,
/// anything else → 400).
fn payload_error(e: PayloadError) -> AppError {
    let err = actix_web::Error::from(e);
    AppError::classify(&err).with_source(err.to_string())
}

async fn read_body(mut payload: web::Payload, limit: usize) -> Result<Bytes, AppError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(payload_error)?;
        if body.len() + chunk.len() > limit {
            return Err(AppError::too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

fn has_authorization(req: &HttpRequest) -> bool {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.trim().is_empty())
}

enum Outcome<T> {
    Finished(ContextError),
    Completed(T),
    Lost,
}

async fn dispatch(route: Arc<Route>, req: HttpRequest, payload: web::Payload) -> HttpResponse {
    let fail = |err: AppError| (route.error_handler)(&req, &err);

    let base = trace_ctx::with_trace_id(&Context::background(), RequestId::of(&req));
    let (ctx, _guard) = if route.timeout.is_zero() {
        base.with_cancel()
    } else {
        base.with_timeout(route.timeout)
    };

    if route.settings.must_authorized && !has_authorization(&req) {
        return fail(AppError::unauthorized());
    }

    match route.endpoint.clone() {
        Endpoint::Json(handler) => {
            let body = match ctx.run_until_done(read_body(payload, route.body_limit)).await {
                Ok(Ok(body)) => body,
                Ok(Err(err)) => return fail(err),
                Err(err) => return fail(err.into()),
            };
            let request = Request::from_http(&req, body);
            let scope = route.path.clone();

            let (tx, rx) = oneshot::channel();
            let worker_ctx = ctx.clone();
            tokio::spawn(
                async move {
                    let result = panic::contain(&scope, handler(worker_ctx, request)).await;
                    // Receiver is gone once the deadline won the race.
                    let _ = tx.send(result);
                }
                .instrument(Span::current()),
            );

            let outcome = tokio::select! {
                err = ctx.done() => Outcome::Finished(err),
                res = rx => res.map_or(Outcome::Lost, Outcome::Completed),
            };

            match outcome {
                Outcome::Finished(ContextError::DeadlineExceeded) => {
                    warn!(
                        path = %route.path,
                        timeout_ms = route.timeout.as_millis() as u64,
                        "request timed out"
                    );
                    fail(AppError::timeout())
                }
                Outcome::Completed(Err(err)) if err.is_timeout() => fail(AppError::timeout()),
                Outcome::Completed(Err(err)) => fail(err),
                Outcome::Completed(Ok(Some(resp))) => resp.send(),
                Outcome::Completed(Ok(None)) => {
                    warn!(path = %route.path, "handler returned no response");
                    fail(AppError::internal_msg("Internal server error"))
                }
                Outcome::Finished(ContextError::Canceled) | Outcome::Lost => {
                    fail(AppError::internal_msg("Internal server error"))
                }
            }
        }
        Endpoint::Custom(handler) => {
            let scope = route.path.clone();
            let (tx, rx) = oneshot::channel();
            let worker_ctx = ctx.clone();
            let worker_req = req.clone();
            actix_web::rt::spawn(
                async move {
                    let result = panic::contain(&scope, handler(worker_ctx, worker_req)).await;
                    let _ = tx.send(result);
                }
                .instrument(Span::current()),
            );

            let outcome = tokio::select! {
                err = ctx.done() => Outcome::Finished(err),
                res = rx => res.map_or(Outcome::Lost, Outcome::Completed),
            };

            match outcome {
                Outcome::Completed(Ok(resp)) => resp,
                Outcome::Completed(Err(err)) if err.is_timeout() => fail(AppError::timeout()),
                Outcome::Completed(Err(err)) => fail(err),
                Outcome::Finished(_) => fail(AppError::timeout()),
                Outcome::Lost => fail(AppError::internal_msg("Internal server error")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::errors::ErrorCode;

    #[test]
    fn test_payload_errors_are_classified() {
        let err = payload_error(PayloadError::Overflow);
        assert_eq!(err.kind(), ErrorKind::TooLarge);
        assert_eq!(err.status().as_u16(), 413);

        let err = payload_error(PayloadError::Incomplete(None));
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn test_defaults_are_applied() {
        let router = Router::new(RouterOptions {
            request_timeout: Duration::ZERO,
            port: 0,
            ..RouterOptions::default()
        });
        assert_eq!(router.options().request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(router.options().port, DEFAULT_PORT);
    }

    #[test]
    fn test_group_concatenates_prefix_without_touching_parent() {
        let router = Router::new(RouterOptions {
            prefix: "/api".to_string(),
            ..RouterOptions::default()
        });
        let ok = |_ctx: Context, _req: Request| async {
            Ok::<_, AppError>(crate::response::JsonResponse::new())
        };
        router.group("/v1", |v1| {
            v1.group("/wardrobe", |w| {
                w.get("/{id}", ok, &[]);
            });
            v1.get("/ping", ok, &[]);
        });
        router.get("/health", ok, &[]);

        assert_eq!(
            router.route_list(),
            vec![
                "GET /api/v1/wardrobe/{id}".to_string(),
                "GET /api/v1/ping".to_string(),
                "GET /api/health".to_string(),
            ]
        );
        assert_eq!(router.options().prefix, "/api");
    }

    #[test]
    fn test_route_timeout_override() {
        let router = Router::new(RouterOptions::default());
        let ok = |_ctx: Context, _req: Request| async {
            Ok::<_, AppError>(crate::response::JsonResponse::new())
        };
        router.put("/slow", ok, &[with_timeout(Duration::from_millis(500))]);
        router.put("/unbounded", ok, &[with_timeout(Duration::ZERO)]);
        router.put("/default", ok, &[]);
        let routes = router.routes.read();
        assert_eq!(routes[0].timeout, Duration::from_millis(500));
        assert!(routes[1].timeout.is_zero());
        assert_eq!(routes[2].timeout, DEFAULT_REQUEST_TIMEOUT);
    }
}
