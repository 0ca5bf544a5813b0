//! Panic containment for handler tasks.
//!
//! A process-wide hook records the backtrace of the panicking thread before
//! unwinding starts; the recovery boundary picks it up and logs it next to
//! the panic message.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use futures::FutureExt;
use thiserror::Error;
use tracing::error;

use crate::error::AppError;
use crate::errors::ErrorCode;

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

#[derive(Debug, Error)]
#[error("panic: {0}")]
pub struct PanicError(pub String);

/// Install the capturing hook once, chaining whatever hook was there.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

const NO_BACKTRACE: &str = "<no backtrace captured>";

fn take_backtrace() -> String {
    LAST_BACKTRACE
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_else(|| NO_BACKTRACE.to_string())
}

/// A recovered panic: its message and the stack captured by the hook.
#[derive(Debug, Clone)]
pub struct PanicReport {
    pub message: String,
    pub stack_trace: String,
}

/// Build the report for `payload` and drain this thread's captured stack.
///
/// Must run on the thread that caught the panic.
pub fn panic_report(payload: &(dyn Any + Send)) -> PanicReport {
    PanicReport {
        message: panic_message(payload),
        stack_trace: take_backtrace(),
    }
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Drive `fut`; a panic becomes an internal `AppError` and is logged with its
/// stack trace under `scope`.
pub async fn contain<F, T>(scope: &str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    install_panic_hook();
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(out) => out,
        Err(payload) => {
            let report = panic_report(payload.as_ref());
            error!(
                path = %scope,
                error = %report.message,
                stack_trace = %report.stack_trace,
                "[router.panic_handler] panic have occurred"
            );
            Err(AppError::internal(
                ErrorCode::Internal,
                "internal server error",
                PanicError(report.message),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, INTERNAL_MESSAGE};

    #[tokio::test]
    async fn test_ok_passes_through() {
        let out = contain("/ok", async { Ok::<_, AppError>(3) }).await;
        assert_eq!(out.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let out = contain("/boom", async {
            let detail: Option<&str> = None;
            detail.expect("secret detail");
            Ok::<(), AppError>(())
        })
        .await;
        let err = out.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.public_message(), INTERNAL_MESSAGE);
        assert!(err.to_string().contains("secret detail"));
    }

    #[test]
    fn test_report_drains_captured_stack() {
        install_panic_hook();
        let payload = panic::catch_unwind(|| panic!("kaboom")).unwrap_err();
        let report = panic_report(payload.as_ref());
        assert_eq!(report.message, "kaboom");
        assert!(!report.stack_trace.is_empty());
        assert_ne!(report.stack_trace, NO_BACKTRACE);
        assert_eq!(take_backtrace(), NO_BACKTRACE);
    }

    #[test]
    fn test_panic_message_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(s.as_ref()), "unknown panic payload");
    }
}
