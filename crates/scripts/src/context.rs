//! Shared handles every script runs against.

use std::sync::Arc;

use storefront_db::{DocumentStore, Linker, Query};
use storefront_events::EventBus;
use storefront_workflows::WorkflowEngine;

/// Flags passed through from the command line.
#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    /// Allow scripts that delete data to do so.
    pub confirm_destructive: bool,
    /// Product handle `verify-final` focuses on before falling back to
    /// every product.
    pub product_handle: Option<String>,
}

#[derive(Clone)]
pub struct ScriptContext {
    pub query: Query,
    pub engine: WorkflowEngine,
    pub linker: Linker,
    pub options: ScriptOptions,
}

impl ScriptContext {
    pub fn new(store: Arc<dyn DocumentStore>, events: Arc<EventBus>) -> Self {
        Self {
            query: Query::new(Arc::clone(&store)),
            linker: Linker::new(Arc::clone(&store)),
            engine: WorkflowEngine::new(store, events),
            options: ScriptOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScriptOptions) -> Self {
        self.options = options;
        self
    }
}
