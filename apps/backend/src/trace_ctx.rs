//! Span façade over `tracing`, keyed on the call `Context`.
//!
//! The active span and the request's trace id travel as context values, so
//! code that only holds a `Context` can open child spans without touching
//! the web layer.

use tracing::{info_span, Span};

use crate::context::Context;

#[derive(Clone, Debug)]
pub struct TraceId(pub String);

#[derive(Clone, Debug)]
struct ActiveSpan(Span);

/// An open span. Ends on `end()` or on drop.
#[derive(Debug)]
pub struct SpanHandle {
    span: Span,
}

impl SpanHandle {
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn end(self) {}
}

/// Open `name` as a child of the context's span (or the current span) and
/// return a context carrying the new span.
pub fn start_span(ctx: &Context, name: &'static str) -> (SpanHandle, Context) {
    let parent = ctx
        .value::<ActiveSpan>()
        .map(|s| s.0.clone())
        .unwrap_or_else(Span::current);
    let span = info_span!(parent: &parent, "span", otel.name = name, trace_id = %trace_id(ctx));
    let child = ctx.with_value(ActiveSpan(span.clone()));
    (SpanHandle { span }, child)
}

pub fn with_trace_id(ctx: &Context, trace_id: impl Into<String>) -> Context {
    ctx.with_value(TraceId(trace_id.into()))
}

/// Trace id of the call, "unknown" outside of a request.
pub fn trace_id(ctx: &Context) -> String {
    ctx.value::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_outside_request() {
        assert_eq!(trace_id(&Context::background()), "unknown");
    }

    #[test]
    fn test_trace_id_is_carried_by_children() {
        let ctx = with_trace_id(&Context::background(), "trace-123");
        let (handle, child) = start_span(&ctx, "Wardrobe.Get");
        assert_eq!(trace_id(&child), "trace-123");
        handle.end();
    }

    #[test]
    fn test_span_does_not_leak_to_parent() {
        let ctx = Context::background();
        let (_handle, child) = start_span(&ctx, "outer");
        assert!(child.value::<ActiveSpan>().is_some());
        assert!(ctx.value::<ActiveSpan>().is_none());
    }
}
