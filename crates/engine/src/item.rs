//! The item interaction surface and its factory.
//!
//! The remote authority declares which interaction surface a context needs
//! via `itemServiceKind`; the registry maps that capability key to a
//! registered factory. Server-supplied strings are only ever used as lookup
//! keys, never evaluated.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use runner_core::model::TestContext;

use crate::error::ItemServiceError;

/// The currently loaded item's interaction surface.
#[async_trait]
pub trait ItemService: Send + Sync {
    /// Flushes and finalizes the current interaction. Resolves when it is
    /// safe to navigate away; no in-flight interaction state may be lost or
    /// race the navigation request.
    async fn kill(&self) -> Result<(), ItemServiceError>;

    /// Loads the item content into the host surface.
    async fn load(&self) -> Result<(), ItemServiceError>;
}

/// Builds an [`ItemService`] for a context that declared its kind.
pub trait ItemServiceFactory: Send + Sync {
    fn create(&self, context: &TestContext) -> Arc<dyn ItemService>;
}

/// Surface used when the context declares no interactive item: both
/// operations are immediate no-ops.
pub struct InertItemService;

#[async_trait]
impl ItemService for InertItemService {
    async fn kill(&self) -> Result<(), ItemServiceError> {
        Ok(())
    }

    async fn load(&self) -> Result<(), ItemServiceError> {
        Ok(())
    }
}

/// Maps server-declared capability keys to item service factories.
#[derive(Default, Clone)]
pub struct ItemServiceRegistry {
    factories: HashMap<String, Arc<dyn ItemServiceFactory>>,
}

impl ItemServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for a capability key.
    #[must_use]
    pub fn with_factory(
        mut self,
        kind: impl Into<String>,
        factory: Arc<dyn ItemServiceFactory>,
    ) -> Self {
        self.factories.insert(kind.into(), factory);
        self
    }

    /// Resolves the interaction surface for a context. A context without a
    /// declared kind gets the inert surface.
    ///
    /// # Errors
    ///
    /// Returns `ItemServiceError::UnknownKind` when the server declares a
    /// capability no factory was registered for.
    pub fn resolve(&self, context: &TestContext) -> Result<Arc<dyn ItemService>, ItemServiceError> {
        match &context.item_service_kind {
            None => Ok(Arc::new(InertItemService)),
            Some(kind) => self
                .factories
                .get(kind)
                .map(|factory| factory.create(context))
                .ok_or_else(|| ItemServiceError::UnknownKind { kind: kind.clone() }),
        }
    }
}
