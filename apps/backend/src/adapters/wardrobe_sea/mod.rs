//! SeaORM adapter for the wardrobe table - generic over ConnectionTrait.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::wardrobe;

pub mod dto;

pub use dto::{WardrobeCreate, WardrobeSearch, WardrobeUpdate};

// Adapter functions return DbErr; repos layer maps to DomainError via From<DbErr>.

fn not_found(id: Uuid) -> sea_orm::DbErr {
    sea_orm::DbErr::RecordNotFound(format!("wardrobe {id} not found"))
}

pub async fn insert<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: WardrobeCreate,
) -> Result<wardrobe::Model, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let active = wardrobe::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(dto.name),
        color: Set(dto.color),
        size: Set(dto.size),
        price: Set(dto.price),
        stock: Set(dto.stock),
        created_at: Set(now),
        updated_at: Set(now),
    };
    active.insert(conn).await
}

pub async fn update<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: WardrobeUpdate,
) -> Result<wardrobe::Model, sea_orm::DbErr> {
    let existing = wardrobe::Entity::find_by_id(dto.id)
        .one(conn)
        .await?
        .ok_or_else(|| not_found(dto.id))?;

    let mut active: wardrobe::ActiveModel = existing.into();
    active.name = Set(dto.name);
    active.color = Set(dto.color);
    active.size = Set(dto.size);
    active.price = Set(dto.price);
    active.stock = Set(dto.stock);
    active.updated_at = Set(time::OffsetDateTime::now_utc());
    active.update(conn).await
}

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: Uuid,
) -> Result<Option<wardrobe::Model>, sea_orm::DbErr> {
    wardrobe::Entity::find_by_id(id).one(conn).await
}

pub async fn find_all<C: ConnectionTrait + Send + Sync>(
    conn: &C,
) -> Result<Vec<wardrobe::Model>, sea_orm::DbErr> {
    wardrobe::Entity::find()
        .order_by_asc(wardrobe::Column::CreatedAt)
        .all(conn)
        .await
}

pub async fn delete<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: Uuid,
) -> Result<(), sea_orm::DbErr> {
    let result = wardrobe::Entity::delete_by_id(id).exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

pub async fn search<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    filter: WardrobeSearch,
) -> Result<Vec<wardrobe::Model>, sea_orm::DbErr> {
    let mut query = wardrobe::Entity::find();
    if let Some(color) = filter.color {
        query = query.filter(wardrobe::Column::Color.eq(color));
    }
    if let Some(size) = filter.size {
        query = query.filter(wardrobe::Column::Size.eq(size));
    }
    query
        .order_by_asc(wardrobe::Column::CreatedAt)
        .all(conn)
        .await
}

/// Rows with stock above zero.
pub async fn find_available<C: ConnectionTrait + Send + Sync>(
    conn: &C,
) -> Result<Vec<wardrobe::Model>, sea_orm::DbErr> {
    wardrobe::Entity::find()
        .filter(wardrobe::Column::Stock.ne(0))
        .order_by_asc(wardrobe::Column::CreatedAt)
        .all(conn)
        .await
}

pub async fn find_unavailable<C: ConnectionTrait + Send + Sync>(
    conn: &C,
) -> Result<Vec<wardrobe::Model>, sea_orm::DbErr> {
    wardrobe::Entity::find()
        .filter(wardrobe::Column::Stock.eq(0))
        .order_by_asc(wardrobe::Column::CreatedAt)
        .all(conn)
        .await
}

pub async fn find_stock_less_than<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    amount: i32,
) -> Result<Vec<wardrobe::Model>, sea_orm::DbErr> {
    wardrobe::Entity::find()
        .filter(wardrobe::Column::Stock.lt(amount))
        .order_by_asc(wardrobe::Column::Stock)
        .all(conn)
        .await
}

/// Overwrite the stock column and return the refreshed row.
pub async fn set_stock<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: Uuid,
    stock: i32,
) -> Result<wardrobe::Model, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let result = wardrobe::Entity::update_many()
        .col_expr(wardrobe::Column::Stock, Expr::val(stock).into())
        .col_expr(wardrobe::Column::UpdatedAt, Expr::val(now).into())
        .filter(wardrobe::Column::Id.eq(id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(not_found(id));
    }

    wardrobe::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))
}
