//! Registry of compile targets.

use crate::traits::Target;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Global target registry.
static TARGETS: RwLock<Vec<&'static dyn Target>> = RwLock::new(Vec::new());
static TARGETS_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Register a custom target.
pub fn register_target(target: &'static dyn Target) {
    TARGETS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(target);
}

fn init_targets() {
    TARGETS_INITIALIZED.get_or_init(|| {
        #[cfg(feature = "appsync")]
        {
            register_target(&crate::traits::APPSYNC_TARGET);
        }
        #[cfg(feature = "apigateway")]
        {
            register_target(&crate::traits::APIGATEWAY_REQUEST_TARGET);
            register_target(&crate::traits::APIGATEWAY_RESPONSE_TARGET);
        }
    });
}

/// Get a target by name.
pub fn target_for_name(name: &str) -> Option<&'static dyn Target> {
    init_targets();
    TARGETS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .find(|t| t.name() == name)
        .copied()
}

/// Get all registered targets.
pub fn targets() -> Vec<&'static dyn Target> {
    init_targets();
    TARGETS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
