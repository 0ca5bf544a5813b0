use std::future::Future;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse};
use futures::future::{BoxFuture, FutureExt, LocalBoxFuture};

use crate::context::Context;
use crate::error::AppError;
use crate::response::JsonResponse;
use crate::router::request::Request;

/// What a JSON handler hands back; `Ok(None)` violates the handler contract.
pub type HandlerResult = Result<Option<JsonResponse>, AppError>;

pub(crate) type BoxedHandler =
    Arc<dyn Fn(Context, Request) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

pub type CustomFuture = LocalBoxFuture<'static, Result<HttpResponse, AppError>>;

pub(crate) type BoxedCustomHandler =
    Arc<dyn Fn(Context, HttpRequest) -> CustomFuture + Send + Sync>;

/// A route handler: `(Context, Request) -> Result<R, AppError>`.
///
/// `R` is usually `JsonResponse` or `Option<JsonResponse>`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Context, req: Request) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, AppError>> + Send + 'static,
    R: Into<Option<JsonResponse>> + 'static,
{
    fn call(&self, ctx: Context, req: Request) -> BoxFuture<'static, HandlerResult> {
        (self)(ctx, req).map(|res| res.map(Into::into)).boxed()
    }
}

pub(crate) fn boxed<H: Handler>(handler: H) -> BoxedHandler {
    let handler = Arc::new(handler);
    Arc::new(move |ctx: Context, req: Request| handler.call(ctx, req))
}

/// A raw handler that writes its own response.
pub trait CustomHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context, req: HttpRequest) -> CustomFuture;
}

impl<F, Fut> CustomHandler for F
where
    F: Fn(Context, HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, AppError>> + 'static,
{
    fn call(&self, ctx: Context, req: HttpRequest) -> CustomFuture {
        (self)(ctx, req).boxed_local()
    }
}

pub(crate) fn boxed_custom<H: CustomHandler>(handler: H) -> BoxedCustomHandler {
    let handler = Arc::new(handler);
    Arc::new(move |ctx: Context, req: HttpRequest| handler.call(ctx, req))
}
