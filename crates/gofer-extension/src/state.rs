//! Application state shared across handlers.

use crate::config::SystemConfig;
use crate::extension::{Extension, ExtensionContext};
use crate::lifecycle::Lifecycle;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SystemConfig>,
    pub extension: Arc<dyn Extension>,
    pub context: ExtensionContext,
    pub lifecycle: Lifecycle,
}

impl AppState {
    pub fn new(
        config: Arc<SystemConfig>,
        extension: Arc<dyn Extension>,
        context: ExtensionContext,
        lifecycle: Lifecycle,
    ) -> Self {
        Self {
            config,
            extension,
            context,
            lifecycle,
        }
    }
}
