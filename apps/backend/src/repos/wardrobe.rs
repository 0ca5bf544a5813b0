//! Wardrobe repository: domain model, storage contract and the sea-orm
//! implementation.
//!
//! Every method takes the call `Context`. When the context carries a `SqlTx`
//! the statement joins that transaction; otherwise it runs on the pool.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapters::wardrobe_sea::{
    self as wardrobe_adapter, WardrobeCreate, WardrobeSearch, WardrobeUpdate,
};
use crate::context::Context;
use crate::entities::wardrobe;
use crate::errors::domain::DomainError;
use crate::txmanager::sql::sql_tx;

/// Wardrobe domain model, also the JSON shape returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wardrobe {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub size: String,
    pub price: f64,
    pub stock: i32,
}

impl From<wardrobe::Model> for Wardrobe {
    fn from(model: wardrobe::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            size: model.size,
            price: model.price,
            stock: model.stock,
        }
    }
}

#[async_trait]
pub trait WardrobeRepository: Send + Sync {
    async fn insert(&self, ctx: &Context, item: WardrobeCreate) -> Result<Wardrobe, DomainError>;
    async fn update(&self, ctx: &Context, item: WardrobeUpdate) -> Result<Wardrobe, DomainError>;
    async fn get_all(&self, ctx: &Context) -> Result<Vec<Wardrobe>, DomainError>;
    async fn get_by_id(&self, ctx: &Context, id: Uuid) -> Result<Option<Wardrobe>, DomainError>;
    async fn delete(&self, ctx: &Context, id: Uuid) -> Result<(), DomainError>;
    async fn search(
        &self,
        ctx: &Context,
        filter: WardrobeSearch,
    ) -> Result<Vec<Wardrobe>, DomainError>;
    async fn set_stock(
        &self,
        ctx: &Context,
        id: Uuid,
        stock: i32,
    ) -> Result<Wardrobe, DomainError>;
    async fn get_available(&self, ctx: &Context) -> Result<Vec<Wardrobe>, DomainError>;
    async fn get_unavailable(&self, ctx: &Context) -> Result<Vec<Wardrobe>, DomainError>;
    async fn get_less_than(
        &self,
        ctx: &Context,
        amount: i32,
    ) -> Result<Vec<Wardrobe>, DomainError>;
}

/// Runs an adapter call on the ambient transaction when present, else on the
/// pool. The call is abandoned once `$ctx` finishes.
macro_rules! on_conn {
    ($self:ident, $ctx:ident, |$conn:ident| $body:expr) => {
        match sql_tx($ctx) {
            Some($conn) => $ctx.run_until_done($body).await?,
            None => {
                let $conn = &$self.db;
                $ctx.run_until_done($body).await?
            }
        }
    };
}

#[derive(Debug, Clone)]
pub struct WardrobeRepoSea {
    db: DatabaseConnection,
}

impl WardrobeRepoSea {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn into_list(models: Vec<wardrobe::Model>) -> Vec<Wardrobe> {
    models.into_iter().map(Wardrobe::from).collect()
}

#[async_trait]
impl WardrobeRepository for WardrobeRepoSea {
    async fn insert(&self, ctx: &Context, item: WardrobeCreate) -> Result<Wardrobe, DomainError> {
        let model = on_conn!(self, ctx, |conn| wardrobe_adapter::insert(conn, item))?;
        Ok(model.into())
    }

    async fn update(&self, ctx: &Context, item: WardrobeUpdate) -> Result<Wardrobe, DomainError> {
        let model = on_conn!(self, ctx, |conn| wardrobe_adapter::update(conn, item))?;
        Ok(model.into())
    }

    async fn get_all(&self, ctx: &Context) -> Result<Vec<Wardrobe>, DomainError> {
        let models = on_conn!(self, ctx, |conn| wardrobe_adapter::find_all(conn))?;
        Ok(into_list(models))
    }

    async fn get_by_id(&self, ctx: &Context, id: Uuid) -> Result<Option<Wardrobe>, DomainError> {
        let model = on_conn!(self, ctx, |conn| wardrobe_adapter::find_by_id(conn, id))?;
        Ok(model.map(Wardrobe::from))
    }

    async fn delete(&self, ctx: &Context, id: Uuid) -> Result<(), DomainError> {
        on_conn!(self, ctx, |conn| wardrobe_adapter::delete(conn, id))?;
        Ok(())
    }

    async fn search(
        &self,
        ctx: &Context,
        filter: WardrobeSearch,
    ) -> Result<Vec<Wardrobe>, DomainError> {
        let models = on_conn!(self, ctx, |conn| wardrobe_adapter::search(conn, filter))?;
        Ok(into_list(models))
    }

    async fn set_stock(
        &self,
        ctx: &Context,
        id: Uuid,
        stock: i32,
    ) -> Result<Wardrobe, DomainError> {
        let model = on_conn!(self, ctx, |conn| {
            wardrobe_adapter::set_stock(conn, id, stock)
        })?;
        Ok(model.into())
    }

    async fn get_available(&self, ctx: &Context) -> Result<Vec<Wardrobe>, DomainError> {
        let models = on_conn!(self, ctx, |conn| wardrobe_adapter::find_available(conn))?;
        Ok(into_list(models))
    }

    async fn get_unavailable(&self, ctx: &Context) -> Result<Vec<Wardrobe>, DomainError> {
        let models = on_conn!(self, ctx, |conn| wardrobe_adapter::find_unavailable(conn))?;
        Ok(into_list(models))
    }

    async fn get_less_than(
        &self,
        ctx: &Context,
        amount: i32,
    ) -> Result<Vec<Wardrobe>, DomainError> {
        let models = on_conn!(self, ctx, |conn| {
            wardrobe_adapter::find_stock_less_than(conn, amount)
        })?;
        Ok(into_list(models))
    }
}
