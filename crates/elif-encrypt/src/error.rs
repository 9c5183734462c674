use crate::config::ConfigError;
use crate::host::HostError;
use crate::version::{Version, VersionSignal};
use thiserror::Error;

/// Fatal errors raised while bootstrapping the encryption wiring.
///
/// Every variant aborts startup. None of them is retried: the inputs are
/// static configuration and version signals that cannot change within the
/// lifetime of a process.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Unsupported host framework version {found}: elif-encrypt requires >= {minimum}")]
    UnsupportedVersion { found: Version, minimum: Version },

    #[error("No wiring bundle is compatible with {signal}")]
    UnresolvableBundle { signal: VersionSignal },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Activation failed: {0}")]
    Activation(#[from] HostError),
}

impl BootstrapError {
    /// Create an unsupported version error
    pub fn unsupported_version(found: Version, minimum: Version) -> Self {
        Self::UnsupportedVersion { found, minimum }
    }

    /// Create an unresolvable bundle error
    pub fn unresolvable_bundle(signal: VersionSignal) -> Self {
        Self::UnresolvableBundle { signal }
    }

    /// Check if the error is an unsupported version error
    pub fn is_unsupported_version(&self) -> bool {
        matches!(self, Self::UnsupportedVersion { .. })
    }

    /// Check if the error is an unresolvable bundle error
    pub fn is_unresolvable_bundle(&self) -> bool {
        matches!(self, Self::UnresolvableBundle { .. })
    }

    /// Check if the error is an invalid configuration error
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }

    /// Check if the error is an activation error
    pub fn is_activation(&self) -> bool {
        matches!(self, Self::Activation(_))
    }
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;
