use crate::context::Context;
use crate::error::AppError;
use crate::response::JsonResponse;
use crate::router::Request;

/// Liveness probe.
pub async fn ping(_ctx: Context, _req: Request) -> Result<JsonResponse, AppError> {
    Ok(JsonResponse::new().set_data("ok"))
}
