//! Wardrobe use cases.
//!
//! Validation happens here, storage goes through `WardrobeRepository`, and
//! read-modify-write sequences run inside `Manager::execute` so the read
//! and the write share one transaction.

use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::adapters::wardrobe_sea::{WardrobeCreate, WardrobeSearch, WardrobeUpdate};
use crate::context::Context;
use crate::error::AppError;
use crate::errors::domain::DomainError;
use crate::errors::ErrorCode;
use crate::repos::wardrobe::{Wardrobe, WardrobeRepository};
use crate::trace_ctx;
use crate::txmanager::Manager;

/// Threshold used by `get_less_than` when the caller gives none.
pub const DEFAULT_LESS_THAN: i32 = 5;

/// Body of insert and update calls.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WardrobeInput {
    pub name: String,
    pub color: String,
    pub size: String,
    pub price: f64,
    pub stock: i32,
}

impl WardrobeInput {
    fn validate(&self) -> Result<(), AppError> {
        let required = [
            (&self.name, ErrorCode::NameEmpty),
            (&self.color, ErrorCode::ColorEmpty),
            (&self.size, ErrorCode::SizeEmpty),
        ];
        for (value, code) in required {
            if value.trim().is_empty() {
                return Err(AppError::bad_request(code, code.default_message()));
            }
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::bad_request(
                ErrorCode::PriceEmpty,
                ErrorCode::PriceEmpty.default_message(),
            ));
        }
        if self.stock < 0 {
            return Err(AppError::bad_request(
                ErrorCode::StockEmpty,
                ErrorCode::StockEmpty.default_message(),
            ));
        }
        Ok(())
    }
}

fn not_found(id: Uuid) -> AppError {
    debug!(%id, "wardrobe not found");
    let code = ErrorCode::WardrobeNotFound;
    DomainError::not_found(code, code.default_message()).into()
}

fn positive_amount(amount: i32) -> Result<i32, AppError> {
    if amount <= 0 {
        return Err(AppError::bad_request(
            ErrorCode::StockEmpty,
            "amount must be greater than zero",
        ));
    }
    Ok(amount)
}

/// Run `f` inside a child span named `name`.
async fn traced<T, F, Fut>(ctx: &Context, name: &'static str, f: F) -> Result<T, AppError>
where
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let (span, ctx) = trace_ctx::start_span(ctx, name);
    let out = f(ctx).instrument(span.span().clone()).await;
    span.end();
    out
}

#[derive(Clone)]
pub struct WardrobeService {
    repo: Arc<dyn WardrobeRepository>,
    tx: Manager,
}

impl WardrobeService {
    pub fn new(repo: Arc<dyn WardrobeRepository>, tx: Manager) -> Self {
        Self { repo, tx }
    }

    pub async fn insert(&self, ctx: &Context, input: WardrobeInput) -> Result<Wardrobe, AppError> {
        traced(ctx, "WardrobeUseCases.Insert", |ctx| async move {
            input.validate()?;
            let item = WardrobeCreate {
                name: input.name,
                color: input.color.to_lowercase(),
                size: input.size.to_lowercase(),
                price: input.price,
                stock: input.stock,
            };
            let created = self.repo.insert(&ctx, item).await?;
            debug!(id = %created.id, "wardrobe inserted");
            Ok(created)
        })
        .await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        id: Uuid,
        input: WardrobeInput,
    ) -> Result<Wardrobe, AppError> {
        traced(ctx, "WardrobeUseCases.Update", |ctx| async move {
            input.validate()?;
            let item = WardrobeUpdate {
                id,
                name: input.name,
                color: input.color.to_lowercase(),
                size: input.size.to_lowercase(),
                price: input.price,
                stock: input.stock,
            };
            Ok(self.repo.update(&ctx, item).await?)
        })
        .await
    }

    pub async fn get(&self, ctx: &Context, id: Uuid) -> Result<Wardrobe, AppError> {
        traced(ctx, "WardrobeUseCases.GetById", |ctx| async move {
            self.repo.get_by_id(&ctx, id).await?.ok_or_else(|| not_found(id))
        })
        .await
    }

    pub async fn get_all(&self, ctx: &Context) -> Result<Vec<Wardrobe>, AppError> {
        traced(ctx, "WardrobeUseCases.GetAll", |ctx| async move {
            Ok(self.repo.get_all(&ctx).await?)
        })
        .await
    }

    pub async fn delete(&self, ctx: &Context, id: Uuid) -> Result<(), AppError> {
        traced(ctx, "WardrobeUseCases.Delete", |ctx| async move {
            Ok(self.repo.delete(&ctx, id).await?)
        })
        .await
    }

    /// Equality search on color and size; both are matched lowercased and an
    /// empty value leaves that column unfiltered.
    pub async fn search(
        &self,
        ctx: &Context,
        color: &str,
        size: &str,
    ) -> Result<Vec<Wardrobe>, AppError> {
        let normalize = |v: &str| {
            let v = v.trim().to_lowercase();
            (!v.is_empty()).then_some(v)
        };
        let filter = WardrobeSearch {
            color: normalize(color),
            size: normalize(size),
        };
        traced(ctx, "WardrobeUseCases.Search", |ctx| async move {
            Ok(self.repo.search(&ctx, filter).await?)
        })
        .await
    }

    pub async fn add_stock(
        &self,
        ctx: &Context,
        id: Uuid,
        amount: i32,
    ) -> Result<Wardrobe, AppError> {
        let amount = positive_amount(amount)?;
        traced(ctx, "WardrobeUseCases.AddStock", |ctx| async move {
            self.adjust_stock(&ctx, id, amount).await
        })
        .await
    }

    /// Fails with `InsufficientStock` instead of going below zero.
    pub async fn sub_stock(
        &self,
        ctx: &Context,
        id: Uuid,
        amount: i32,
    ) -> Result<Wardrobe, AppError> {
        let amount = positive_amount(amount)?;
        traced(ctx, "WardrobeUseCases.SubStock", |ctx| async move {
            self.adjust_stock(&ctx, id, -amount).await
        })
        .await
    }

    async fn adjust_stock(
        &self,
        ctx: &Context,
        id: Uuid,
        delta: i32,
    ) -> Result<Wardrobe, AppError> {
        let repo = Arc::clone(&self.repo);
        self.tx
            .execute(
                ctx,
                move |tx_ctx| async move {
                    let current = repo
                        .get_by_id(&tx_ctx, id)
                        .await?
                        .ok_or_else(|| not_found(id))?;
                    let stock = current
                        .stock
                        .checked_add(delta)
                        .filter(|s| *s >= 0)
                        .ok_or_else(|| {
                            AppError::bad_request(
                                ErrorCode::InsufficientStock,
                                ErrorCode::InsufficientStock.default_message(),
                            )
                        })?;
                    Ok(repo.set_stock(&tx_ctx, id, stock).await?)
                },
                None,
            )
            .await
    }

    pub async fn get_available(&self, ctx: &Context) -> Result<Vec<Wardrobe>, AppError> {
        traced(ctx, "WardrobeUseCases.GetAvailable", |ctx| async move {
            Ok(self.repo.get_available(&ctx).await?)
        })
        .await
    }

    pub async fn get_unavailable(&self, ctx: &Context) -> Result<Vec<Wardrobe>, AppError> {
        traced(ctx, "WardrobeUseCases.GetUnavailable", |ctx| async move {
            Ok(self.repo.get_unavailable(&ctx).await?)
        })
        .await
    }

    /// Items whose stock is below `amount`; a non-positive amount uses
    /// `DEFAULT_LESS_THAN`.
    pub async fn get_less_than(
        &self,
        ctx: &Context,
        amount: i32,
    ) -> Result<Vec<Wardrobe>, AppError> {
        let amount = if amount <= 0 { DEFAULT_LESS_THAN } else { amount };
        traced(ctx, "WardrobeUseCases.GetLessThan", |ctx| async move {
            Ok(self.repo.get_less_than(&ctx, amount).await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::error::ErrorKind;
    use crate::txmanager::{TxFn, TxManager, TxOptions, TxValue};

    struct Passthrough;

    #[async_trait]
    impl TxManager for Passthrough {
        async fn execute(
            &self,
            ctx: &Context,
            f: TxFn,
            _opts: Option<TxOptions>,
        ) -> Result<TxValue, AppError> {
            f(ctx.clone()).await
        }
    }

    #[derive(Default)]
    struct MemoryRepo {
        items: Mutex<HashMap<Uuid, Wardrobe>>,
    }

    impl MemoryRepo {
        fn seed(&self, stock: i32) -> Uuid {
            let id = Uuid::new_v4();
            self.items.lock().insert(
                id,
                Wardrobe {
                    id,
                    name: "shirt".into(),
                    color: "red".into(),
                    size: "m".into(),
                    price: 10.0,
                    stock,
                },
            );
            id
        }

        fn filtered(&self, keep: impl Fn(&Wardrobe) -> bool) -> Vec<Wardrobe> {
            self.items.lock().values().filter(|w| keep(*w)).cloned().collect()
        }
    }

    #[async_trait]
    impl WardrobeRepository for MemoryRepo {
        async fn insert(
            &self,
            _ctx: &Context,
            item: WardrobeCreate,
        ) -> Result<Wardrobe, DomainError> {
            let w = Wardrobe {
                id: Uuid::new_v4(),
                name: item.name,
                color: item.color,
                size: item.size,
                price: item.price,
                stock: item.stock,
            };
            self.items.lock().insert(w.id, w.clone());
            Ok(w)
        }

        async fn update(
            &self,
            _ctx: &Context,
            item: WardrobeUpdate,
        ) -> Result<Wardrobe, DomainError> {
            let mut items = self.items.lock();
            let w = items
                .get_mut(&item.id)
                .ok_or_else(|| DomainError::not_found(ErrorCode::WardrobeNotFound, "missing"))?;
            w.name = item.name;
            w.color = item.color;
            w.size = item.size;
            w.price = item.price;
            w.stock = item.stock;
            Ok(w.clone())
        }

        async fn get_all(&self, _ctx: &Context) -> Result<Vec<Wardrobe>, DomainError> {
            Ok(self.filtered(|_| true))
        }

        async fn get_by_id(
            &self,
            _ctx: &Context,
            id: Uuid,
        ) -> Result<Option<Wardrobe>, DomainError> {
            Ok(self.items.lock().get(&id).cloned())
        }

        async fn delete(&self, _ctx: &Context, id: Uuid) -> Result<(), DomainError> {
            self.items
                .lock()
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| DomainError::not_found(ErrorCode::WardrobeNotFound, "missing"))
        }

        async fn search(
            &self,
            _ctx: &Context,
            filter: WardrobeSearch,
        ) -> Result<Vec<Wardrobe>, DomainError> {
            Ok(self.filtered(|w| {
                filter.color.as_deref().map_or(true, |c| w.color == c)
                    && filter.size.as_deref().map_or(true, |s| w.size == s)
            }))
        }

        async fn set_stock(
            &self,
            _ctx: &Context,
            id: Uuid,
            stock: i32,
        ) -> Result<Wardrobe, DomainError> {
            let mut items = self.items.lock();
            let w = items
                .get_mut(&id)
                .ok_or_else(|| DomainError::not_found(ErrorCode::WardrobeNotFound, "missing"))?;
            w.stock = stock;
            Ok(w.clone())
        }

        async fn get_available(&self, _ctx: &Context) -> Result<Vec<Wardrobe>, DomainError> {
            Ok(self.filtered(|w| w.stock != 0))
        }

        async fn get_unavailable(&self, _ctx: &Context) -> Result<Vec<Wardrobe>, DomainError> {
            Ok(self.filtered(|w| w.stock == 0))
        }

        async fn get_less_than(
            &self,
            _ctx: &Context,
            amount: i32,
        ) -> Result<Vec<Wardrobe>, DomainError> {
            Ok(self.filtered(|w| w.stock < amount))
        }
    }

    fn service() -> (WardrobeService, Arc<MemoryRepo>) {
        let repo = Arc::new(MemoryRepo::default());
        let svc = WardrobeService::new(
            Arc::clone(&repo) as Arc<dyn WardrobeRepository>,
            Manager::from_driver(Arc::new(Passthrough)),
        );
        (svc, repo)
    }

    fn input() -> WardrobeInput {
        WardrobeInput {
            name: "Jacket".into(),
            color: "Black".into(),
            size: "XL".into(),
            price: 59.5,
            stock: 3,
        }
    }

    #[tokio::test]
    async fn test_insert_validates_required_fields() {
        let (svc, _) = service();
        let ctx = Context::background();

        let err = svc
            .insert(&ctx, WardrobeInput { name: " ".into(), ..input() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NameEmpty);
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err = svc
            .insert(&ctx, WardrobeInput { color: String::new(), ..input() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ColorEmpty);

        let err = svc
            .insert(&ctx, WardrobeInput { price: -1.0, ..input() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PriceEmpty);
    }

    #[tokio::test]
    async fn test_insert_lowercases_color_and_size() {
        let (svc, _) = service();
        let created = svc.insert(&Context::background(), input()).await.unwrap();
        assert_eq!(created.color, "black");
        assert_eq!(created.size, "xl");
        assert_eq!(created.name, "Jacket");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (svc, _) = service();
        let err = svc.get(&Context::background(), Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), ErrorCode::WardrobeNotFound);
    }

    #[tokio::test]
    async fn test_sub_stock_never_goes_negative() {
        let (svc, repo) = service();
        let id = repo.seed(2);
        let ctx = Context::background();

        let err = svc.sub_stock(&ctx, id, 3).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        let item = svc.sub_stock(&ctx, id, 2).await.unwrap();
        assert_eq!(item.stock, 0);
        let item = svc.add_stock(&ctx, id, 4).await.unwrap();
        assert_eq!(item.stock, 4);
    }

    #[tokio::test]
    async fn test_stock_amount_must_be_positive() {
        let (svc, repo) = service();
        let id = repo.seed(2);
        let err = svc.add_stock(&Context::background(), id, 0).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StockEmpty);
    }

    #[tokio::test]
    async fn test_less_than_defaults_to_five() {
        let (svc, repo) = service();
        repo.seed(4);
        repo.seed(5);
        repo.seed(7);
        let ctx = Context::background();

        assert_eq!(svc.get_less_than(&ctx, 0).await.unwrap().len(), 1);
        assert_eq!(svc.get_less_than(&ctx, 8).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_ignores_case_and_blank_filters() {
        let (svc, _) = service();
        let ctx = Context::background();
        svc.insert(&ctx, input()).await.unwrap();
        svc.insert(&ctx, WardrobeInput { color: "white".into(), ..input() })
            .await
            .unwrap();

        assert_eq!(svc.search(&ctx, "BLACK", "").await.unwrap().len(), 1);
        assert_eq!(svc.search(&ctx, "", "xl").await.unwrap().len(), 2);
        assert!(svc.search(&ctx, "black", "s").await.unwrap().is_empty());
    }
}
