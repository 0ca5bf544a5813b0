//! Builders shared by the HTTP tests.
#![allow(dead_code)]

use std::sync::Arc;

use backend::repos::wardrobe::WardrobeRepoSea;
use backend::routes;
use backend::services::wardrobe::WardrobeService;
use backend::txmanager::sql::{SqlTxConfig, DRIVER_NAME};
use backend::txmanager::{DriverConfig, Manager, Registry};
use backend::{Context, Router, RouterOptions};
use backend_test_support::TestDb;

pub async fn sql_manager(db: &TestDb) -> Manager {
    let registry = Registry::with_default_drivers();
    let cfg = DriverConfig::new(DRIVER_NAME, SqlTxConfig { db: db.conn.clone() });
    Manager::new(&Context::background(), &registry, &cfg)
        .await
        .expect("sql driver")
}

/// The production route table on top of `db`.
pub async fn wardrobe_router(db: &TestDb, options: RouterOptions) -> Router {
    let tx = sql_manager(db).await;
    let service = WardrobeService::new(Arc::new(WardrobeRepoSea::new(db.conn.clone())), tx);

    let router = Router::new(options);
    routes::register(&router, service);
    router
}
