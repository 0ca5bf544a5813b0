#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod adapters;
pub mod config;
pub mod context;
pub mod entities;
pub mod error;
pub mod errors;
pub mod infra;
pub mod middleware;
pub mod repos;
pub mod response;
pub mod router;
pub mod routes;
pub mod services;
pub mod telemetry;
pub mod trace_ctx;
pub mod txmanager;
pub mod utils;

#[cfg(test)]
pub mod test_bootstrap;

// Re-exports for public API
pub use config::AppConfig;
pub use context::Context;
pub use error::AppError;
pub use errors::ErrorCode;
pub use response::JsonResponse;
pub use router::{Request, Router, RouterOptions};
pub use txmanager::{Manager, Registry};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
