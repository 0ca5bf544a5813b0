use std::sync::Arc;

use backend::config::AppConfig;
use backend::context::Context;
use backend::infra::db::bootstrap_db;
use backend::repos::wardrobe::WardrobeRepoSea;
use backend::router::Router;
use backend::routes;
use backend::services::wardrobe::WardrobeService;
use backend::telemetry;
use backend::txmanager::{Manager, Registry};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment
    // (docker env_file, or `set -a; . ./.env; set +a` locally).
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let db = match bootstrap_db(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "failed to prepare database");
            std::process::exit(1);
        }
    };

    let registry = Registry::with_default_drivers();
    let driver = config.driver_config(&db);
    let tx = match Manager::new(&Context::background(), &registry, &driver).await {
        Ok(tx) => tx,
        Err(e) => {
            error!(error = %e, driver = %config.tx_driver, "failed to build transaction manager");
            std::process::exit(1);
        }
    };

    let service = WardrobeService::new(Arc::new(WardrobeRepoSea::new(db)), tx);
    let router = Router::new(config.router_options());
    routes::register(&router, service);

    info!(
        host = %config.host,
        port = config.port,
        base_path = %config.base_path,
        "wardrobe backend ready"
    );
    router.serve().await
}
