use std::sync::Arc;

use crate::router::{must_authorized, Router};
use crate::services::wardrobe::WardrobeService;

pub mod health;
pub mod wardrobe;

/// Register every endpoint of the service on `router`.
pub fn register(router: &Router, service: WardrobeService) {
    router.get("/health", health::ping, &[must_authorized(false)]);

    let controller = Arc::new(wardrobe::WardrobeController::new(service));
    router.group("/v1", |v1| {
        v1.group("/wardrobe", |w| wardrobe::register(w, controller));
    });
}
