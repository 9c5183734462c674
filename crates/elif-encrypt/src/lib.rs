//! # elif-encrypt
//!
//! Bootstrap-time wiring of field-level encryption into the elif.rs ORM.
//!
//! At startup the bundle reads its configuration and the versions of the host
//! framework, the runtime and the mapping library, then selects exactly one
//! wiring bundle: the event-interception mechanism to register with the ORM
//! and the way the encryptor obtains its key material.
//!
//! ```rust,no_run
//! use elif_encrypt::{BootstrapOrchestrator, EnvVersionProbe, ListenerHost, RawConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let raw = RawConfig::from_yaml_file("config/elif_encrypt.yaml")?;
//! let mut host = ListenerHost::new();
//! let context = BootstrapOrchestrator::new().load(raw, &EnvVersionProbe, &mut host)?;
//! println!("active wiring: {}", context.bundle());
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod compat;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod parameters;
pub mod registry;
pub mod toggle;
pub mod version;
pub mod wiring;

pub use bootstrap::{install, install_with, BootstrapOrchestrator, BootstrapState, Resolution};
pub use compat::{CompatibilityResolver, CompatibilityRule, CompatibilityTable, RuleOutcome};
pub use config::{ConfigError, ConfigSource, EncryptConfig, RawConfig};
pub use context::WiringContext;
pub use error::{BootstrapError, BootstrapResult};
pub use host::{
    Activation, EncryptedRecord, Encryptor, EncryptorError, FieldEncryptionListener, HostError,
    ListenerError, ListenerHost, SecretSource, WiringHost,
};
pub use parameters::{ConfigurationPropagator, ParameterValue, WiringParameters};
pub use registry::{EncryptorBinding, EncryptorRegistry};
pub use toggle::{Advisory, AdvisorySink, CollectingAdvisorySink, FeatureToggleManager, TracingAdvisorySink};
pub use version::{parse_version, EnvVersionProbe, Version, VersionProbe, VersionReq, VersionSignal};
pub use wiring::{
    LifecycleEvent, ListenerKind, MetadataSource, Registration, SecretStrategy, ServiceDefinition,
    WiringBundle,
};
