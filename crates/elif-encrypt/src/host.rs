//! Activation seam between the bootstrap and the ORM's lifecycle dispatcher.
//!
//! The bootstrap hands a host exactly one [`Activation`]. What registration
//! means is up to the host; [`ListenerHost`] is an in-memory host that
//! instantiates the bound encryptor and exposes the resulting listener.

use crate::context::WiringContext;
use crate::parameters::{
    PARAM_ENABLE_SECRET_GENERATION, PARAM_ENCRYPTOR_CLASS_NAME, PARAM_SECRET,
    PARAM_SECRET_DIRECTORY_PATH,
};
use crate::wiring::{LifecycleEvent, ListenerKind, SecretStrategy, ServiceDefinition, WiringBundle};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Suffix marking a stored value as ciphertext
pub const ENCRYPTED_SUFFIX: &str = "<ENC>";

/// Everything a host needs to attach one wiring bundle
#[derive(Debug, Clone)]
pub struct Activation {
    pub services: Vec<ServiceDefinition>,
    pub context: Arc<WiringContext>,
}

impl Activation {
    pub fn new(context: Arc<WiringContext>) -> Self {
        Self {
            services: context.bundle().services(),
            context,
        }
    }

    pub fn bundle(&self) -> WiringBundle {
        self.context.bundle()
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("A wiring bundle is already attached ({bundle})")]
    AlreadyAttached { bundle: WiringBundle },

    #[error("No encryptor implementation registered as '{identifier}'")]
    UnknownEncryptor { identifier: String },

    #[error("Encryptor '{identifier}' could not be created: {source}")]
    EncryptorInit {
        identifier: String,
        #[source]
        source: EncryptorError,
    },

    #[error("Missing wiring parameter '{name}'")]
    MissingParameter { name: &'static str },

    #[error("Host rejected the wiring: {message}")]
    Rejected { message: String },
}

impl HostError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// The persistence framework's side of activation
pub trait WiringHost {
    /// Register the bundle's services with the lifecycle dispatcher
    fn attach(&mut self, activation: &Activation) -> Result<(), HostError>;
}

#[derive(Debug, Error)]
pub enum EncryptorError {
    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("key material unavailable: {0}")]
    KeyMaterial(String),
}

/// Symmetric encryption of individual field values
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptorError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, EncryptorError>;
}

/// Key material handed to an encryptor factory
#[derive(Clone, PartialEq, Eq)]
pub enum SecretSource {
    Literal(String),
    Directory { path: PathBuf, generate: bool },
}

impl SecretSource {
    /// Derive the source from the published parameters
    pub fn from_context(context: &WiringContext) -> Result<Self, HostError> {
        let parameters = context.parameters();
        match context.bundle().secret {
            SecretStrategy::SecretSupplied => parameters
                .get_str(PARAM_SECRET)
                .map(|secret| SecretSource::Literal(secret.to_string()))
                .ok_or(HostError::MissingParameter { name: PARAM_SECRET }),
            SecretStrategy::SecretFactory => {
                let path = parameters.get_str(PARAM_SECRET_DIRECTORY_PATH).ok_or(
                    HostError::MissingParameter {
                        name: PARAM_SECRET_DIRECTORY_PATH,
                    },
                )?;
                let generate = parameters
                    .get_bool(PARAM_ENABLE_SECRET_GENERATION)
                    .ok_or(HostError::MissingParameter {
                        name: PARAM_ENABLE_SECRET_GENERATION,
                    })?;
                Ok(SecretSource::Directory {
                    path: PathBuf::from(path),
                    generate,
                })
            }
        }
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Literal(_) => f.write_str("Literal(<redacted>)"),
            SecretSource::Directory { path, generate } => f
                .debug_struct("Directory")
                .field("path", path)
                .field("generate", generate)
                .finish(),
        }
    }
}

pub type EncryptorFactory =
    Arc<dyn Fn(&SecretSource) -> Result<Arc<dyn Encryptor>, EncryptorError> + Send + Sync>;

/// A persisted object as seen by the listener: field values plus the names of
/// the fields marked for encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub entity: String,
    pub fields: BTreeMap<String, String>,
    pub encrypted_fields: BTreeSet<String>,
}

impl EncryptedRecord {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: BTreeMap::new(),
            encrypted_fields: BTreeSet::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_encrypted_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.encrypted_fields.insert(name.clone());
        self.fields.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to {operation} field '{field}' of '{entity}': {source}")]
    Encryption {
        entity: String,
        field: String,
        operation: &'static str,
        #[source]
        source: EncryptorError,
    },

    #[error(transparent)]
    Encryptor(#[from] EncryptorError),
}

/// Encrypts marked fields on flush and decrypts them on load
pub struct FieldEncryptionListener {
    kind: ListenerKind,
    encryptor: Arc<dyn Encryptor>,
    context: Arc<WiringContext>,
}

impl FieldEncryptionListener {
    pub fn new(kind: ListenerKind, encryptor: Arc<dyn Encryptor>, context: Arc<WiringContext>) -> Self {
        Self {
            kind,
            encryptor,
            context,
        }
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    pub fn dispatch(&self, event: LifecycleEvent, record: &mut EncryptedRecord) -> Result<(), ListenerError> {
        match event {
            LifecycleEvent::OnFlush => self.on_flush(record),
            LifecycleEvent::PostLoad | LifecycleEvent::PostFlush => self.post_load(record),
        }
    }

    /// Replace plaintext in marked fields with ciphertext.
    ///
    /// The record is only updated once every marked field encrypted.
    pub fn on_flush(&self, record: &mut EncryptedRecord) -> Result<(), ListenerError> {
        let mut encrypted = Vec::with_capacity(record.encrypted_fields.len());
        for field in &record.encrypted_fields {
            let Some(value) = record.fields.get(field) else {
                continue;
            };
            if value.ends_with(ENCRYPTED_SUFFIX) {
                continue;
            }
            let ciphertext = self
                .encryptor
                .encrypt(value)
                .map_err(|e| self.wrap(&record.entity, field, "encrypt", e))?;
            encrypted.push((field.clone(), format!("{}{}", ciphertext, ENCRYPTED_SUFFIX)));
        }

        record.fields.extend(encrypted);
        Ok(())
    }

    /// Restore plaintext in marked fields, all or nothing
    pub fn post_load(&self, record: &mut EncryptedRecord) -> Result<(), ListenerError> {
        let mut decrypted = Vec::with_capacity(record.encrypted_fields.len());
        for field in &record.encrypted_fields {
            let Some(ciphertext) = record
                .fields
                .get(field)
                .and_then(|value| value.strip_suffix(ENCRYPTED_SUFFIX))
            else {
                continue;
            };
            let plaintext = self
                .encryptor
                .decrypt(ciphertext)
                .map_err(|e| self.wrap(&record.entity, field, "decrypt", e))?;
            decrypted.push((field.clone(), plaintext));
        }

        record.fields.extend(decrypted);
        Ok(())
    }

    fn wrap(&self, entity: &str, field: &str, operation: &'static str, source: EncryptorError) -> ListenerError {
        if self.context.wrap_exceptions() {
            ListenerError::Encryption {
                entity: entity.to_string(),
                field: field.to_string(),
                operation,
                source,
            }
        } else {
            ListenerError::Encryptor(source)
        }
    }
}

impl fmt::Debug for FieldEncryptionListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldEncryptionListener")
            .field("kind", &self.kind)
            .field("wrap_exceptions", &self.context.wrap_exceptions())
            .finish_non_exhaustive()
    }
}

struct Attached {
    bundle: WiringBundle,
    services: Vec<ServiceDefinition>,
    listener: Arc<FieldEncryptionListener>,
}

/// In-memory host resolving encryptor identifiers through registered factories
#[derive(Default)]
pub struct ListenerHost {
    factories: HashMap<String, EncryptorFactory>,
    attached: Option<Attached>,
}

impl ListenerHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an implementation identifier instantiable
    pub fn register_encryptor<F>(&mut self, identifier: impl Into<String>, factory: F)
    where
        F: Fn(&SecretSource) -> Result<Arc<dyn Encryptor>, EncryptorError> + Send + Sync + 'static,
    {
        self.factories.insert(identifier.into(), Arc::new(factory));
    }

    pub fn with_encryptor<F>(mut self, identifier: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&SecretSource) -> Result<Arc<dyn Encryptor>, EncryptorError> + Send + Sync + 'static,
    {
        self.register_encryptor(identifier, factory);
        self
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Services registered by the attached bundle
    pub fn services(&self) -> &[ServiceDefinition] {
        self.attached
            .as_ref()
            .map(|attached| attached.services.as_slice())
            .unwrap_or_default()
    }

    pub fn listener(&self) -> Option<Arc<FieldEncryptionListener>> {
        self.attached
            .as_ref()
            .map(|attached| Arc::clone(&attached.listener))
    }
}

impl WiringHost for ListenerHost {
    fn attach(&mut self, activation: &Activation) -> Result<(), HostError> {
        if let Some(attached) = &self.attached {
            return Err(HostError::AlreadyAttached {
                bundle: attached.bundle,
            });
        }

        let context = &activation.context;
        let identifier = context
            .parameters()
            .get_str(PARAM_ENCRYPTOR_CLASS_NAME)
            .ok_or(HostError::MissingParameter {
                name: PARAM_ENCRYPTOR_CLASS_NAME,
            })?;
        let factory = self
            .factories
            .get(identifier)
            .ok_or_else(|| HostError::UnknownEncryptor {
                identifier: identifier.to_string(),
            })?;

        let source = SecretSource::from_context(context)?;
        let encryptor = factory(&source).map_err(|source| HostError::EncryptorInit {
            identifier: identifier.to_string(),
            source,
        })?;

        let kind = activation.bundle().listener;
        tracing::info!(
            listener = %kind,
            encryptor = identifier,
            services = activation.services.len(),
            "Attached field encryption listener"
        );

        self.attached = Some(Attached {
            bundle: activation.bundle(),
            services: activation.services.clone(),
            listener: Arc::new(FieldEncryptionListener::new(
                kind,
                encryptor,
                Arc::clone(context),
            )),
        });
        Ok(())
    }
}

impl fmt::Debug for ListenerHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut identifiers: Vec<&String> = self.factories.keys().collect();
        identifiers.sort();
        f.debug_struct("ListenerHost")
            .field("encryptors", &identifiers)
            .field("attached", &self.is_attached())
            .finish()
    }
}
