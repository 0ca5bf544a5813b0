//! Per-route toggles.
//!
//! Options are small closures applied left to right over the route's
//! settings, so the last option of a kind wins and new toggles can be added
//! without touching the engine's signature.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Effective settings of one route after all options are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSettings {
    pub must_authorized: bool,
    /// `Some(Duration::ZERO)` disables the deadline for the route.
    pub request_timeout: Option<Duration>,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            must_authorized: true,
            request_timeout: None,
        }
    }
}

impl RouteSettings {
    pub fn resolve(options: &[RouteOption]) -> Self {
        let mut settings = Self::default();
        for option in options {
            option.apply(&mut settings);
        }
        settings
    }

    /// Route override if any, else the router default.
    pub fn effective_timeout(&self, router_default: Duration) -> Duration {
        self.request_timeout.unwrap_or(router_default)
    }
}

#[derive(Clone)]
pub struct RouteOption(Arc<dyn Fn(&mut RouteSettings) + Send + Sync>);

impl RouteOption {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut RouteSettings) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, settings: &mut RouteSettings) {
        (self.0)(settings)
    }
}

impl fmt::Debug for RouteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RouteOption")
    }
}

/// Require an `Authorization` header before the handler runs.
pub fn must_authorized(value: bool) -> RouteOption {
    RouteOption::new(move |s| s.must_authorized = value)
}

/// Override the router-level timeout for this route.
pub fn with_timeout(value: Duration) -> RouteOption {
    RouteOption::new(move |s| s.request_timeout = Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = RouteSettings::resolve(&[]);
        assert!(s.must_authorized);
        assert_eq!(s.effective_timeout(Duration::from_secs(10)), Duration::from_secs(10));
    }

    #[test]
    fn test_last_option_wins() {
        let s = RouteSettings::resolve(&[
            must_authorized(false),
            with_timeout(Duration::from_secs(1)),
            must_authorized(true),
            with_timeout(Duration::from_millis(500)),
        ]);
        assert!(s.must_authorized);
        assert_eq!(s.request_timeout, Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_zero_override_is_kept() {
        let s = RouteSettings::resolve(&[with_timeout(Duration::ZERO)]);
        assert_eq!(s.effective_timeout(Duration::from_secs(10)), Duration::ZERO);
    }
}
