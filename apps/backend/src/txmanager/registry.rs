use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use super::{DriverPayload, TxManager};
use crate::context::Context;
use crate::error::AppError;
use crate::utils::SyncMap;

/// Builds a driver from its payload.
pub type Factory = Arc<
    dyn Fn(Context, DriverPayload) -> BoxFuture<'static, Result<Arc<dyn TxManager>, AppError>>
        + Send
        + Sync,
>;

/// Driver name → factory.
///
/// Filled during startup and passed to `Manager::new`; lookups afterwards
/// only take the shared lock.
#[derive(Default)]
pub struct Registry {
    factories: SyncMap<Factory>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("drivers", &self.names())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every driver this crate ships (`sql`).
    pub fn with_default_drivers() -> Self {
        let registry = Self::new();
        registry.register(super::sql::DRIVER_NAME, super::sql::factory());
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register(&self, name: impl Into<String>, factory: Factory) {
        let name = name.into();
        debug!(driver = %name, "registering transaction driver");
        self.factories.store(name, factory);
    }

    pub fn get(&self, name: &str) -> Option<Factory> {
        self.factories.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names = self.factories.keys();
        names.sort();
        names
    }
}
