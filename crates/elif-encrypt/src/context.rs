//! Immutable wiring state shared with every encryptor and listener.
//!
//! A [`WiringContext`] is built once by the bootstrap and handed out as an
//! `Arc`. Hosts that need a process-wide lookup install it with
//! [`install_global`], which only succeeds once.

use crate::config::ConfigError;
use crate::parameters::WiringParameters;
use crate::registry::EncryptorBinding;
use crate::version::VersionSignal;
use crate::wiring::WiringBundle;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::sync::Arc;

static GLOBAL_CONTEXT: OnceCell<Arc<WiringContext>> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WiringContext {
    bundle: WiringBundle,
    encryptor: EncryptorBinding,
    parameters: WiringParameters,
    versions: VersionSignal,
    wrap_exceptions: bool,
}

impl WiringContext {
    pub(crate) fn new(
        bundle: WiringBundle,
        encryptor: EncryptorBinding,
        parameters: WiringParameters,
        versions: VersionSignal,
        wrap_exceptions: bool,
    ) -> Self {
        Self {
            bundle,
            encryptor,
            parameters,
            versions,
            wrap_exceptions,
        }
    }

    pub fn bundle(&self) -> WiringBundle {
        self.bundle
    }

    pub fn encryptor(&self) -> &EncryptorBinding {
        &self.encryptor
    }

    pub fn parameters(&self) -> &WiringParameters {
        &self.parameters
    }

    pub fn versions(&self) -> &VersionSignal {
        &self.versions
    }

    /// Whether encryptor errors are wrapped in listener errors
    pub fn wrap_exceptions(&self) -> bool {
        self.wrap_exceptions
    }
}

/// Install the process-wide context; fails if one is already installed
pub fn install_global(context: Arc<WiringContext>) -> Result<(), ConfigError> {
    GLOBAL_CONTEXT
        .set(context)
        .map_err(|_| ConfigError::already_loaded("active"))
}

/// The process-wide context, if bootstrap installed one
pub fn global() -> Option<Arc<WiringContext>> {
    GLOBAL_CONTEXT.get().cloned()
}
