//! HTTP controllers for `/v1/wardrobe`.
//!
//! Use-case failures are answered with `custom_error_response` so the
//! envelope carries the business code of the failure.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::context::Context;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::response::{custom_error_response, JsonResponse};
use crate::router::{must_authorized, Handler, Request, Router};
use crate::services::wardrobe::{WardrobeInput, WardrobeService};
use crate::trace_ctx;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StockInput {
    #[serde(default)]
    pub amount: i32,
}

fn parse_id(req: &Request) -> Result<Uuid, AppError> {
    let raw = req.param("id");
    let code = ErrorCode::InvalidId;
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::bad_request(code, code.default_message()))
}

async fn respond<T, F, Fut>(
    ctx: &Context,
    name: &'static str,
    f: F,
) -> Result<JsonResponse, AppError>
where
    T: Serialize,
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let (span, ctx) = trace_ctx::start_span(ctx, name);
    let result = f(ctx).instrument(span.span().clone()).await;
    span.end();
    Ok(match result {
        Ok(data) => JsonResponse::new().set_data(data),
        Err(err) => custom_error_response(&err),
    })
}

pub struct WardrobeController {
    service: WardrobeService,
}

impl WardrobeController {
    pub fn new(service: WardrobeService) -> Self {
        Self { service }
    }

    pub async fn search(&self, ctx: Context, req: Request) -> Result<JsonResponse, AppError> {
        respond(&ctx, "Controller.Search", |ctx| async move {
            self.service
                .search(&ctx, &req.query("color"), &req.query("size"))
                .await
        })
        .await
    }

    pub async fn get_available(
        &self,
        ctx: Context,
        _req: Request,
    ) -> Result<JsonResponse, AppError> {
        respond(&ctx, "Controller.GetAvailable", |ctx| async move {
            self.service.get_available(&ctx).await
        })
        .await
    }

    pub async fn get_unavailable(
        &self,
        ctx: Context,
        _req: Request,
    ) -> Result<JsonResponse, AppError> {
        respond(&ctx, "Controller.GetUnavailable", |ctx| async move {
            self.service.get_unavailable(&ctx).await
        })
        .await
    }

    /// `?amount=` that is missing or not a number falls back to the
    /// service default.
    pub async fn get_less_than(
        &self,
        ctx: Context,
        req: Request,
    ) -> Result<JsonResponse, AppError> {
        let amount = req.query("amount").trim().parse::<i32>().unwrap_or(0);
        respond(&ctx, "Controller.GetLessThan", |ctx| async move {
            self.service.get_less_than(&ctx, amount).await
        })
        .await
    }

    pub async fn update(&self, ctx: Context, req: Request) -> Result<JsonResponse, AppError> {
        respond(&ctx, "Controller.Update", |ctx| async move {
            let id = parse_id(&req)?;
            let input: WardrobeInput = req.json()?;
            self.service.update(&ctx, id, input).await
        })
        .await
    }

    pub async fn get_by_id(&self, ctx: Context, req: Request) -> Result<JsonResponse, AppError> {
        respond(&ctx, "Controller.GetById", |ctx| async move {
            let id = parse_id(&req)?;
            self.service.get(&ctx, id).await
        })
        .await
    }

    pub async fn delete(&self, ctx: Context, req: Request) -> Result<JsonResponse, AppError> {
        respond(&ctx, "Controller.Delete", |ctx| async move {
            let id = parse_id(&req)?;
            self.service.delete(&ctx, id).await?;
            Ok("success")
        })
        .await
    }

    pub async fn add_stock(&self, ctx: Context, req: Request) -> Result<JsonResponse, AppError> {
        respond(&ctx, "Controller.AddStock", |ctx| async move {
            let id = parse_id(&req)?;
            let input: StockInput = req.json()?;
            self.service.add_stock(&ctx, id, input.amount).await
        })
        .await
    }

    pub async fn sub_stock(&self, ctx: Context, req: Request) -> Result<JsonResponse, AppError> {
        respond(&ctx, "Controller.SubStock", |ctx| async move {
            let id = parse_id(&req)?;
            let input: StockInput = req.json()?;
            self.service.sub_stock(&ctx, id, input.amount).await
        })
        .await
    }

    pub async fn get_all(&self, ctx: Context, _req: Request) -> Result<JsonResponse, AppError> {
        respond(&ctx, "Controller.GetAll", |ctx| async move {
            self.service.get_all(&ctx).await
        })
        .await
    }

    pub async fn insert(&self, ctx: Context, req: Request) -> Result<JsonResponse, AppError> {
        respond(&ctx, "Controller.Insert", |ctx| async move {
            let input: WardrobeInput = req.json()?;
            self.service.insert(&ctx, input).await
        })
        .await
    }
}

/// Adapt a controller method into a route handler.
fn bind<F, Fut>(controller: &Arc<WardrobeController>, f: F) -> impl Handler
where
    F: Fn(Arc<WardrobeController>, Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<JsonResponse, AppError>> + Send + 'static,
{
    let controller = Arc::clone(controller);
    move |ctx: Context, req: Request| f(Arc::clone(&controller), ctx, req)
}

/// Mount the wardrobe endpoints on `router` (already scoped to `/wardrobe`).
///
/// Literal segments are registered before `/{id}` so they win the match.
pub fn register(router: &Router, controller: Arc<WardrobeController>) {
    let open = [must_authorized(false)];
    let c = &controller;

    router.get("/search", bind(c, |c, ctx, req| async move { c.search(ctx, req).await }), &open);
    router.get(
        "/ready",
        bind(c, |c, ctx, req| async move { c.get_available(ctx, req).await }),
        &open,
    );
    router.get(
        "/out",
        bind(c, |c, ctx, req| async move { c.get_unavailable(ctx, req).await }),
        &open,
    );
    router.get(
        "/less",
        bind(c, |c, ctx, req| async move { c.get_less_than(ctx, req).await }),
        &open,
    );
    router.put("/{id}", bind(c, |c, ctx, req| async move { c.update(ctx, req).await }), &open);
    router.get("/{id}", bind(c, |c, ctx, req| async move { c.get_by_id(ctx, req).await }), &open);
    router.delete("/{id}", bind(c, |c, ctx, req| async move { c.delete(ctx, req).await }), &open);
    router.put(
        "/{id}/addStock",
        bind(c, |c, ctx, req| async move { c.add_stock(ctx, req).await }),
        &open,
    );
    router.put(
        "/{id}/subStock",
        bind(c, |c, ctx, req| async move { c.sub_stock(ctx, req).await }),
        &open,
    );
    router.get("", bind(c, |c, ctx, req| async move { c.get_all(ctx, req).await }), &open);
    router.post("", bind(c, |c, ctx, req| async move { c.insert(ctx, req).await }), &open);
}
