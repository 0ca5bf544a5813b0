//! sea-orm backed transaction driver, registered as `sql`.
//!
//! The open transaction travels on the context as `SqlTx`; repositories
//! call `sql_tx(ctx)` and fall back to the plain connection when it is
//! absent.
//!
//! The unit of work runs under the call's deadline. A context that is already
//! finished opens nothing; one that finishes mid-way or before commit rolls
//! the transaction back and reports the context error.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::FutureExt;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};
use tracing::{debug, error, warn};

use super::{DriverPayload, Factory, TxFn, TxManager, TxOptions, TxValue};
use crate::context::Context;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::router::panic::{install_panic_hook, panic_report, PanicError};

pub const DRIVER_NAME: &str = "sql";

/// Construction payload of the `sql` driver.
#[derive(Clone, Debug)]
pub struct SqlTxConfig {
    pub db: DatabaseConnection,
}

/// Options accepted by `execute`; `None` fields use the database defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SqlTxOptions {
    pub isolation_level: Option<IsolationLevel>,
    pub access_mode: Option<AccessMode>,
}

/// Ambient transaction handle.
#[derive(Clone)]
pub struct SqlTx(Arc<DatabaseTransaction>);

/// Transaction carried by `ctx`, if any. Absence means "run outside a
/// transaction", not an error.
pub fn sql_tx(ctx: &Context) -> Option<&DatabaseTransaction> {
    ctx.value::<SqlTx>().map(|tx| tx.0.as_ref())
}

pub struct SqlTxManager {
    db: DatabaseConnection,
}

impl SqlTxManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub fn factory() -> Factory {
    Arc::new(|_ctx: Context, payload: DriverPayload| {
        async move {
            let cfg = payload
                .downcast_ref::<SqlTxConfig>()
                .ok_or_else(|| AppError::config("failed to decode config"))?;
            Ok(Arc::new(SqlTxManager::new(cfg.db.clone())) as Arc<dyn TxManager>)
        }
        .boxed()
    })
}

async fn rollback(txn: DatabaseTransaction) {
    if let Err(e) = txn.rollback().await {
        error!(error = %e, "failed to rollback transaction");
    }
}

#[async_trait]
impl TxManager for SqlTxManager {
    async fn execute(
        &self,
        ctx: &Context,
        f: TxFn,
        opts: Option<TxOptions>,
    ) -> Result<TxValue, AppError> {
        let options = match opts {
            None => SqlTxOptions::default(),
            Some(opts) => *opts
                .downcast_ref::<SqlTxOptions>()
                .ok_or_else(|| AppError::internal_msg("options is not valid"))?,
        };

        if ctx.value::<SqlTx>().is_some() {
            debug!("joining ambient transaction");
            return ctx.run_until_done(f(ctx.clone())).await?;
        }

        // An expired context never opens a transaction.
        let txn = ctx
            .run_until_done(
                self.db
                    .begin_with_config(options.isolation_level, options.access_mode),
            )
            .await?
            .map_err(|e| {
                AppError::internal(ErrorCode::TransactionError, "failed to begin transaction", e)
            })?;
        let txn = Arc::new(txn);
        let tx_ctx = ctx.with_value(SqlTx(Arc::clone(&txn)));

        install_panic_hook();
        let outcome = AssertUnwindSafe(async move {
            let run_ctx = tx_ctx.clone();
            run_ctx.run_until_done(f(tx_ctx)).await
        })
        .catch_unwind()
        .await;

        let txn = match Arc::try_unwrap(txn) {
            Ok(txn) => txn,
            Err(shared) => {
                // A clone of the handle outlived the unit of work; dropping
                // ours leaves the rollback to whoever drops the last one.
                drop(shared);
                error!("transaction handle escaped the unit of work");
                return match outcome {
                    Ok(Ok(Err(e))) => Err(e),
                    Ok(Err(done)) => Err(done.into()),
                    _ => Err(AppError::internal_msg("transaction handle escaped the unit of work")
                        .with_source("transaction abandoned")),
                };
            }
        };

        match outcome {
            Err(payload) => {
                let report = panic_report(payload.as_ref());
                error!(
                    panic = %report.message,
                    stack_trace = %report.stack_trace,
                    "Panic when executing transaction"
                );
                rollback(txn).await;
                Err(AppError::internal(
                    ErrorCode::TransactionError,
                    "panic happened when executing transaction",
                    PanicError(report.message),
                ))
            }
            Ok(Err(done)) => {
                warn!(reason = %done, "context finished before the unit of work");
                rollback(txn).await;
                Err(done.into())
            }
            Ok(Ok(Err(e))) => {
                error!(error = %e, "Error when executing transaction");
                rollback(txn).await;
                Err(e)
            }
            Ok(Ok(Ok(value))) => {
                if let Some(done) = ctx.err() {
                    warn!(reason = %done, "context finished before commit");
                    rollback(txn).await;
                    return Err(done.into());
                }
                txn.commit().await.map_err(|e| {
                    AppError::internal(
                        ErrorCode::TransactionError,
                        "failed to commit transaction",
                        e,
                    )
                })?;
                Ok(value)
            }
        }
    }
}
