//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::storage::AnnotationStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: Arc<dyn AnnotationStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn AnnotationStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the annotation store
    pub fn store(&self) -> &Arc<dyn AnnotationStore> {
        &self.inner.store
    }
}
