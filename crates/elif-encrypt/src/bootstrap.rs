//! One-shot bootstrap of the encryption wiring.
//!
//! The orchestrator moves through `Unconfigured -> Resolving -> Active`
//! exactly once. Any failure leaves it in `Resolving`: nothing was exposed to
//! the rest of the process, and a second `load` is refused.

use crate::compat::CompatibilityResolver;
use crate::config::{ConfigError, EncryptConfig, RawConfig};
use crate::context::{self, WiringContext};
use crate::error::BootstrapResult;
use crate::host::{Activation, WiringHost};
use crate::parameters::{ConfigurationPropagator, WiringParameters};
use crate::registry::{EncryptorBinding, EncryptorRegistry};
use crate::toggle::FeatureToggleManager;
use crate::version::{VersionProbe, VersionSignal};
use crate::wiring::WiringBundle;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Unconfigured,
    Resolving,
    Active,
}

impl BootstrapState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapState::Unconfigured => "unconfigured",
            BootstrapState::Resolving => "resolving",
            BootstrapState::Active => "active",
        }
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolution, before anything is activated
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: EncryptConfig,
    pub binding: EncryptorBinding,
    pub bundle: WiringBundle,
    pub parameters: WiringParameters,
    pub versions: VersionSignal,
}

impl Resolution {
    fn into_context(self, wrap_exceptions: bool) -> WiringContext {
        WiringContext::new(
            self.bundle,
            self.binding,
            self.parameters,
            self.versions,
            wrap_exceptions,
        )
    }
}

/// Composes configuration, encryptor resolution, compatibility selection,
/// parameter publication and the exception-wrapping toggle.
#[derive(Debug)]
pub struct BootstrapOrchestrator {
    registry: EncryptorRegistry,
    resolver: CompatibilityResolver,
    propagator: ConfigurationPropagator,
    toggles: FeatureToggleManager,
    state: BootstrapState,
    context: Option<Arc<WiringContext>>,
}

impl BootstrapOrchestrator {
    pub fn new() -> Self {
        Self {
            registry: EncryptorRegistry::new(),
            resolver: CompatibilityResolver::default(),
            propagator: ConfigurationPropagator,
            toggles: FeatureToggleManager::default(),
            state: BootstrapState::Unconfigured,
            context: None,
        }
    }

    pub fn with_registry(mut self, registry: EncryptorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_resolver(mut self, resolver: CompatibilityResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_toggles(mut self, toggles: FeatureToggleManager) -> Self {
        self.toggles = toggles;
        self
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == BootstrapState::Active
    }

    /// The active wiring, once bootstrap succeeded
    pub fn context(&self) -> Option<Arc<WiringContext>> {
        self.context.clone()
    }

    pub fn registry(&self) -> &EncryptorRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &CompatibilityResolver {
        &self.resolver
    }

    /// Resolve configuration and versions without activating anything.
    ///
    /// Version support is checked before parameters are published.
    pub fn resolve(&self, raw: RawConfig, versions: &VersionSignal) -> BootstrapResult<Resolution> {
        let config = EncryptConfig::from_raw(raw)?;
        let binding = self.registry.resolve(config.encryptor_class());
        let bundle = self
            .resolver
            .select_for(versions, config.has_inline_secret())?;
        let parameters = self.propagator.publish(&config, &binding)?;

        Ok(Resolution {
            config,
            binding,
            bundle,
            parameters,
            versions: versions.clone(),
        })
    }

    /// Resolve and activate the wiring. May only succeed once.
    pub fn load<P, H>(
        &mut self,
        raw: RawConfig,
        versions: &P,
        host: &mut H,
    ) -> BootstrapResult<Arc<WiringContext>>
    where
        P: VersionProbe + ?Sized,
        H: WiringHost + ?Sized,
    {
        if self.state != BootstrapState::Unconfigured {
            return Err(ConfigError::already_loaded(self.state.as_str()).into());
        }
        self.state = BootstrapState::Resolving;

        let signal = versions.detect()?;
        let resolution = self.resolve(raw, &signal)?;
        let wrap_exceptions = self.toggles.resolve(resolution.config.wrap_exceptions());
        let context = Arc::new(resolution.into_context(wrap_exceptions));

        host.attach(&Activation::new(Arc::clone(&context)))?;

        tracing::info!(
            bundle = %context.bundle(),
            encryptor = %context.encryptor().implementation,
            wrap_exceptions,
            "Field encryption wiring active"
        );

        self.context = Some(Arc::clone(&context));
        self.state = BootstrapState::Active;
        Ok(context)
    }
}

impl Default for BootstrapOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Bootstrap with the default orchestrator and install the result as the
/// process-wide wiring context.
pub fn install<P, H>(raw: RawConfig, versions: &P, host: &mut H) -> BootstrapResult<Arc<WiringContext>>
where
    P: VersionProbe + ?Sized,
    H: WiringHost + ?Sized,
{
    install_with(BootstrapOrchestrator::new(), raw, versions, host)
}

/// Like [`install`], with a configured orchestrator
pub fn install_with<P, H>(
    mut orchestrator: BootstrapOrchestrator,
    raw: RawConfig,
    versions: &P,
    host: &mut H,
) -> BootstrapResult<Arc<WiringContext>>
where
    P: VersionProbe + ?Sized,
    H: WiringHost + ?Sized,
{
    if context::global().is_some() {
        return Err(ConfigError::already_loaded(BootstrapState::Active.as_str()).into());
    }

    let context = orchestrator.load(raw, versions, host)?;
    context::install_global(Arc::clone(&context))?;
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BootstrapError;
    use crate::host::HostError;
    use crate::parameters::{PARAM_ENCRYPTOR_CLASS_NAME, PARAM_SECRET};
    use crate::toggle::CollectingAdvisorySink;
    use crate::wiring::{ListenerKind, SecretStrategy};

    #[derive(Default)]
    struct RecordingHost {
        attached: Vec<WiringBundle>,
        refuse: bool,
    }

    impl WiringHost for RecordingHost {
        fn attach(&mut self, activation: &Activation) -> Result<(), HostError> {
            if self.refuse {
                return Err(HostError::rejected("dispatcher unavailable"));
            }
            self.attached.push(activation.bundle());
            Ok(())
        }
    }

    fn orchestrator(sink: &CollectingAdvisorySink) -> BootstrapOrchestrator {
        BootstrapOrchestrator::new()
            .with_toggles(FeatureToggleManager::isolated(Arc::new(sink.clone())))
    }

    fn signal(framework: &str, runtime: &str, mapping: &str) -> VersionSignal {
        VersionSignal::parse(framework, runtime, mapping).unwrap()
    }

    fn raw() -> RawConfig {
        RawConfig::new().with_secret_directory_path("/var/secrets")
    }

    #[test]
    fn test_starts_unconfigured() {
        let orchestrator = BootstrapOrchestrator::new();
        assert_eq!(orchestrator.state(), BootstrapState::Unconfigured);
        assert!(orchestrator.context().is_none());
    }

    #[test]
    fn test_load_activates_once() {
        let sink = CollectingAdvisorySink::new();
        let mut orchestrator = orchestrator(&sink);
        let mut host = RecordingHost::default();

        let context = orchestrator
            .load(raw(), &signal("6.4", "8.2", "2.17"), &mut host)
            .unwrap();

        assert!(orchestrator.is_active());
        assert_eq!(
            context.bundle(),
            WiringBundle::new(
                ListenerKind::AnnotationAndAttributeSubscriber,
                SecretStrategy::SecretFactory
            )
        );
        assert_eq!(host.attached, vec![context.bundle()]);
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn test_second_load_is_refused_and_keeps_wiring() {
        let sink = CollectingAdvisorySink::new();
        let mut orchestrator = orchestrator(&sink);
        let mut host = RecordingHost::default();

        let first = orchestrator
            .load(raw(), &signal("7.0", "8.3", "3.1"), &mut host)
            .unwrap();
        let err = orchestrator
            .load(raw().with_secret("other"), &signal("6.4", "7.4", "2.17"), &mut host)
            .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::InvalidConfiguration(ConfigError::AlreadyLoaded { ref state }) if state == "active"
        ));
        assert_eq!(host.attached.len(), 1);
        assert!(Arc::ptr_eq(&orchestrator.context().unwrap(), &first));
        assert!(!first.parameters().contains(PARAM_SECRET));
    }

    #[test]
    fn test_unsupported_framework_publishes_nothing() {
        let sink = CollectingAdvisorySink::new();
        let mut orchestrator = orchestrator(&sink);
        let mut host = RecordingHost::default();

        let err = orchestrator
            .load(raw(), &signal("4.4", "8.2", "2.17"), &mut host)
            .unwrap_err();

        assert!(err.is_unsupported_version());
        assert!(host.attached.is_empty());
        assert!(orchestrator.context().is_none());
        assert_eq!(orchestrator.state(), BootstrapState::Resolving);
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_failed_load_poisons_orchestrator() {
        let sink = CollectingAdvisorySink::new();
        let mut orchestrator = orchestrator(&sink);
        let mut host = RecordingHost::default();

        let err = orchestrator
            .load(RawConfig::new(), &signal("6.4", "8.2", "2.17"), &mut host)
            .unwrap_err();
        assert!(err.is_invalid_configuration());

        let err = orchestrator
            .load(raw(), &signal("6.4", "8.2", "2.17"), &mut host)
            .unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::InvalidConfiguration(ConfigError::AlreadyLoaded { ref state }) if state == "resolving"
        ));
        assert!(host.attached.is_empty());
    }

    #[test]
    fn test_host_refusal_is_fatal() {
        let sink = CollectingAdvisorySink::new();
        let mut orchestrator = orchestrator(&sink);
        let mut host = RecordingHost {
            refuse: true,
            ..Default::default()
        };

        let err = orchestrator
            .load(raw(), &signal("7.1", "8.3", "3.1"), &mut host)
            .unwrap_err();

        assert!(err.is_activation());
        assert!(!orchestrator.is_active());
        assert!(orchestrator.context().is_none());
    }

    #[test]
    fn test_resolve_is_a_dry_run() {
        let orchestrator = BootstrapOrchestrator::new();
        let resolution = orchestrator
            .resolve(
                raw().with_encryptor_class("Defuse"),
                &signal("6.4", "8.0", "3.1"),
            )
            .unwrap();

        assert_eq!(resolution.bundle.listener, ListenerKind::AttributeOnlyListener);
        assert_eq!(
            resolution.parameters.get_str(PARAM_ENCRYPTOR_CLASS_NAME),
            Some(crate::registry::DEFUSE_ENCRYPTOR)
        );
        assert_eq!(orchestrator.state(), BootstrapState::Unconfigured);
    }

    #[test]
    fn test_custom_alias_registry() {
        let sink = CollectingAdvisorySink::new();
        let mut orchestrator = orchestrator(&sink).with_registry(
            EncryptorRegistry::new().with_alias("Vault", "my_app::crypto::VaultEncryptor"),
        );
        let mut host = RecordingHost::default();

        let context = orchestrator
            .load(
                raw().with_encryptor_class("Vault").with_wrap_exceptions(true),
                &signal("7.0", "8.3", "3.1"),
                &mut host,
            )
            .unwrap();

        assert_eq!(
            context.parameters().get_str(PARAM_ENCRYPTOR_CLASS_NAME),
            Some("my_app::crypto::VaultEncryptor")
        );
        assert!(context.wrap_exceptions());
        assert_eq!(sink.count(), 0);
    }
}
