//! Driver-agnostic transaction manager.
//!
//! Use cases run a unit of work through `Manager::execute`; the active driver
//! opens the transaction, attaches its handle to the derived `Context` and
//! commits or rolls back depending on the outcome. Drivers are looked up by
//! name in a `Registry` handed to `Manager::new`.

pub mod registry;
pub mod sql;

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tracing::Instrument;

use crate::context::Context;
use crate::error::AppError;
use crate::trace_ctx;

pub use registry::{Factory, Registry};

/// Type-erased result of a unit of work.
pub type TxValue = Box<dyn Any + Send>;

/// Type-erased unit of work, invoked with the transactional context.
pub type TxFn = Box<dyn FnOnce(Context) -> BoxFuture<'static, Result<TxValue, AppError>> + Send>;

/// Driver-specific transaction options, e.g. `sql::SqlTxOptions`.
pub struct TxOptions(Box<dyn Any + Send + Sync>);

impl TxOptions {
    pub fn new<T: Any + Send + Sync>(options: T) -> Self {
        Self(Box::new(options))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for TxOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TxOptions(..)")
    }
}

/// Driver-specific construction payload, e.g. `sql::SqlTxConfig`.
#[derive(Clone)]
pub struct DriverPayload(Arc<dyn Any + Send + Sync>);

impl DriverPayload {
    pub fn new<T: Any + Send + Sync>(config: T) -> Self {
        Self(Arc::new(config))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for DriverPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DriverPayload(..)")
    }
}

/// Which driver to build and what to build it with.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub kind: String,
    pub config: Option<DriverPayload>,
}

impl DriverConfig {
    pub fn new<T: Any + Send + Sync>(kind: impl Into<String>, config: T) -> Self {
        Self {
            kind: kind.into(),
            config: Some(DriverPayload::new(config)),
        }
    }
}

/// One storage driver's begin/commit/rollback sequence.
#[async_trait]
pub trait TxManager: Send + Sync {
    /// Run `f` inside a transaction.
    ///
    /// Panic in `f` → roll back, return an internal error. Error from `f` →
    /// roll back, return that error unchanged. Otherwise commit; a failed
    /// commit is the returned error. Rollback failures are logged only.
    async fn execute(
        &self,
        ctx: &Context,
        f: TxFn,
        opts: Option<TxOptions>,
    ) -> Result<TxValue, AppError>;
}

/// Typed front of the active driver.
#[derive(Clone)]
pub struct Manager {
    driver: Arc<dyn TxManager>,
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Manager")
    }
}

impl Manager {
    /// Build the driver named by `cfg.kind`.
    ///
    /// An unregistered kind is a configuration error and no factory runs.
    pub async fn new(
        ctx: &Context,
        registry: &Registry,
        cfg: &DriverConfig,
    ) -> Result<Self, AppError> {
        let factory = registry.get(&cfg.kind).ok_or_else(|| {
            AppError::config(format!("[txmanager] unsupported driver: {}", cfg.kind))
        })?;
        let payload = cfg
            .config
            .clone()
            .ok_or_else(|| AppError::config("[txmanager] missing config"))?;
        let driver = factory(ctx.clone(), payload).await?;
        Ok(Self { driver })
    }

    pub fn from_driver(driver: Arc<dyn TxManager>) -> Self {
        Self { driver }
    }

    pub async fn execute<T, F, Fut>(
        &self,
        ctx: &Context,
        f: F,
        opts: Option<TxOptions>,
    ) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(Context) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let (span, ctx) = trace_ctx::start_span(ctx, "TxManager.Execute");
        let unit: TxFn = Box::new(move |tx_ctx: Context| {
            async move { f(tx_ctx).await.map(|v| Box::new(v) as TxValue) }.boxed()
        });

        let out = self
            .driver
            .execute(&ctx, unit, opts)
            .instrument(span.span().clone())
            .await;
        span.end();

        out?.downcast::<T>()
            .map(|v| *v)
            .map_err(|_| AppError::internal_msg("[txmanager] unexpected result type"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::errors::ErrorCode;

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

    fn passthrough_factory(calls: Arc<AtomicUsize>) -> Factory {
        Arc::new(move |_ctx: Context, _payload: DriverPayload| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<Arc<dyn TxManager>, AppError>(Arc::new(Passthrough)) }.boxed()
        })
    }

    #[tokio::test]
    async fn test_unknown_driver_never_calls_a_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new();
        registry.register("sql", passthrough_factory(Arc::clone(&calls)));

        let cfg = DriverConfig::new("oracle", ());
        let err = Manager::new(&Context::background(), &registry, &cfg)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigError);
        assert!(err.message().contains("unsupported driver"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_payload_is_config_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new();
        registry.register("noop", passthrough_factory(Arc::clone(&calls)));
        let cfg = DriverConfig {
            kind: "noop".to_string(),
            config: None,
        };
        let err = Manager::new(&Context::background(), &registry, &cfg)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigError);
        assert!(err.message().contains("missing config"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_registered_driver_is_built_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new();
        registry.register("noop", passthrough_factory(Arc::clone(&calls)));
        Manager::new(&Context::background(), &registry, &DriverConfig::new("noop", ()))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_typed_execute_round_trips_value() {
        let manager = Manager::from_driver(Arc::new(Passthrough));
        let out: String = manager
            .execute(&Context::background(), |_ctx| async { Ok("done".to_string()) }, None)
            .await
            .unwrap();
        assert_eq!(out, "done");
    }

    #[tokio::test]
    async fn test_typed_execute_propagates_error_unchanged() {
        let manager = Manager::from_driver(Arc::new(Passthrough));
        let err = manager
            .execute(
                &Context::background(),
                |_ctx| async {
                    Err::<(), _>(AppError::bad_request(ErrorCode::StockEmpty, "Stock is empty"))
                },
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StockEmpty);
    }
}
