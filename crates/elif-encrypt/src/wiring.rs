//! Wiring bundles and the service definitions they expand to.

use crate::parameters::{
    PARAM_ENABLE_SECRET_GENERATION, PARAM_ENCRYPTOR_CLASS_NAME, PARAM_SECRET,
    PARAM_SECRET_DIRECTORY_PATH,
};
use serde::Serialize;
use std::fmt;

pub const ENCRYPTOR_SERVICE: &str = "elif_encrypt.encryptor";
pub const SECRET_FACTORY_SERVICE: &str = "elif_encrypt.secret_factory";
pub const LISTENER_SERVICE: &str = "elif_encrypt.orm_listener";

/// Event-interception mechanism registered with the ORM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListenerKind {
    /// Event subscriber reading annotation metadata only
    LegacyAnnotationSubscriber,
    /// Event subscriber reading both annotations and attributes
    AnnotationAndAttributeSubscriber,
    /// Entity listener reading attributes only
    AttributeOnlyListener,
}

impl ListenerKind {
    pub const ALL: [ListenerKind; 3] = [
        ListenerKind::LegacyAnnotationSubscriber,
        ListenerKind::AnnotationAndAttributeSubscriber,
        ListenerKind::AttributeOnlyListener,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerKind::LegacyAnnotationSubscriber => "legacy-annotation-subscriber",
            ListenerKind::AnnotationAndAttributeSubscriber => "annotation-and-attribute-subscriber",
            ListenerKind::AttributeOnlyListener => "attribute-only-listener",
        }
    }

    /// Where encrypted-field markers are read from
    pub fn metadata_sources(&self) -> &'static [MetadataSource] {
        match self {
            ListenerKind::LegacyAnnotationSubscriber => &[MetadataSource::Annotations],
            ListenerKind::AnnotationAndAttributeSubscriber => {
                &[MetadataSource::Annotations, MetadataSource::Attributes]
            }
            ListenerKind::AttributeOnlyListener => &[MetadataSource::Attributes],
        }
    }

    pub fn registration(&self) -> Registration {
        match self {
            ListenerKind::AttributeOnlyListener => Registration::EventListener,
            _ => Registration::EventSubscriber,
        }
    }

    /// Lifecycle events the listener intercepts
    pub fn events(&self) -> &'static [LifecycleEvent] {
        &[
            LifecycleEvent::PostLoad,
            LifecycleEvent::OnFlush,
            LifecycleEvent::PostFlush,
        ]
    }

    fn implementation(&self) -> &'static str {
        match self {
            ListenerKind::LegacyAnnotationSubscriber => {
                "elif_encrypt::listeners::AnnotationSubscriber"
            }
            ListenerKind::AnnotationAndAttributeSubscriber => {
                "elif_encrypt::listeners::AnnotationAndAttributeSubscriber"
            }
            ListenerKind::AttributeOnlyListener => "elif_encrypt::listeners::AttributeListener",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How key material reaches the encryptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretStrategy {
    /// A literal secret from configuration
    SecretSupplied,
    /// A factory loading, or generating, key material in the secret directory
    SecretFactory,
}

impl SecretStrategy {
    pub fn for_inline_secret(has_inline_secret: bool) -> Self {
        if has_inline_secret {
            SecretStrategy::SecretSupplied
        } else {
            SecretStrategy::SecretFactory
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SecretStrategy::SecretSupplied => "secret-supplied",
            SecretStrategy::SecretFactory => "secret-factory",
        }
    }
}

impl fmt::Display for SecretStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataSource {
    Annotations,
    Attributes,
}

impl MetadataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataSource::Annotations => "annotations",
            MetadataSource::Attributes => "attributes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Registration {
    EventSubscriber,
    EventListener,
}

impl Registration {
    /// Container tag the host dispatches on
    pub fn tag(&self) -> &'static str {
        match self {
            Registration::EventSubscriber => "orm.event_subscriber",
            Registration::EventListener => "orm.event_listener",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    PostLoad,
    OnFlush,
    PostFlush,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::PostLoad => "post_load",
            LifecycleEvent::OnFlush => "on_flush",
            LifecycleEvent::PostFlush => "post_flush",
        }
    }
}

/// The single interception mechanism and secret strategy active in a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WiringBundle {
    pub listener: ListenerKind,
    pub secret: SecretStrategy,
}

impl WiringBundle {
    pub fn new(listener: ListenerKind, secret: SecretStrategy) -> Self {
        Self { listener, secret }
    }

    /// Expand the bundle to the services the host has to register
    pub fn services(&self) -> Vec<ServiceDefinition> {
        let mut services = Vec::with_capacity(3);

        match self.secret {
            SecretStrategy::SecretFactory => {
                services.push(
                    ServiceDefinition::new(
                        SECRET_FACTORY_SERVICE,
                        "elif_encrypt::secret::SecretFactory",
                    )
                    .with_argument(Argument::Parameter(PARAM_SECRET_DIRECTORY_PATH.to_string()))
                    .with_argument(Argument::Parameter(
                        PARAM_ENABLE_SECRET_GENERATION.to_string(),
                    )),
                );
                services.push(
                    ServiceDefinition::new(ENCRYPTOR_SERVICE, parameter_ref(PARAM_ENCRYPTOR_CLASS_NAME))
                        .with_argument(Argument::Service(SECRET_FACTORY_SERVICE.to_string())),
                );
            }
            SecretStrategy::SecretSupplied => {
                services.push(
                    ServiceDefinition::new(ENCRYPTOR_SERVICE, parameter_ref(PARAM_ENCRYPTOR_CLASS_NAME))
                        .with_argument(Argument::Parameter(PARAM_SECRET.to_string())),
                );
            }
        }

        let mut listener = ServiceDefinition::new(LISTENER_SERVICE, self.listener.implementation())
            .with_argument(Argument::Service(ENCRYPTOR_SERVICE.to_string()))
            .with_tag(self.listener.registration().tag());
        for event in self.listener.events() {
            listener = listener.with_tag(format!("orm.event:{}", event.as_str()));
        }
        services.push(listener);

        services
    }
}

impl fmt::Display for WiringBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}", self.listener, self.secret)
    }
}

fn parameter_ref(name: &str) -> String {
    format!("%{}%", name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Argument {
    Parameter(String),
    Service(String),
}

/// A service the host registers with its container during activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDefinition {
    pub id: String,
    /// Implementation identifier, or a `%parameter%` reference to one
    pub implementation: String,
    pub arguments: Vec<Argument>,
    pub tags: Vec<String>,
}

impl ServiceDefinition {
    pub fn new(id: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            implementation: implementation.into(),
            arguments: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
