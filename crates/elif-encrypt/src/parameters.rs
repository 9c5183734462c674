use crate::config::{ConfigError, EncryptConfig};
use crate::registry::EncryptorBinding;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub const PARAM_ENCRYPTOR_CLASS_NAME: &str = "elif_encrypt.encryptor_class_name";
pub const PARAM_SECRET_DIRECTORY_PATH: &str = "elif_encrypt.secret_directory_path";
pub const PARAM_ENABLE_SECRET_GENERATION: &str = "elif_encrypt.enable_secret_generation";
pub const PARAM_SECRET: &str = "elif_encrypt.secret";
pub const PARAM_WRAP_EXCEPTIONS: &str = "elif_encrypt.wrap_exceptions";

const REDACTED: &str = "<redacted>";

#[derive(Clone, PartialEq, Eq)]
pub enum ParameterValue {
    String(String),
    Bool(bool),
}

impl ParameterValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(value) => Some(value),
            ParameterValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(value) => Some(*value),
            ParameterValue::String(_) => None,
        }
    }
}

impl fmt::Debug for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::String(value) => write!(f, "{:?}", value),
            ParameterValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// Named parameters published for downstream encryptor and listener services.
///
/// The literal secret is stored as configured. `Debug` and `Serialize`
/// render it redacted; read it with [`WiringParameters::get`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct WiringParameters {
    values: BTreeMap<&'static str, ParameterValue>,
}

impl WiringParameters {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&mut self, name: &'static str, value: ParameterValue) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParameterValue::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParameterValue::as_bool)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameter map with the secret replaced, for logs and diagnostics
    pub fn redacted(&self) -> BTreeMap<&'static str, ParameterValue> {
        self.values
            .iter()
            .map(|(name, value)| {
                let value = if *name == PARAM_SECRET {
                    ParameterValue::String(REDACTED.to_string())
                } else {
                    value.clone()
                };
                (*name, value)
            })
            .collect()
    }
}

impl fmt::Debug for WiringParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.redacted()).finish()
    }
}

impl Serialize for ParameterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParameterValue::String(value) => serializer.serialize_str(value),
            ParameterValue::Bool(value) => serializer.serialize_bool(*value),
        }
    }
}

impl Serialize for WiringParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.redacted().serialize(serializer)
    }
}

/// Publishes validated configuration as named wiring parameters
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigurationPropagator;

impl ConfigurationPropagator {
    pub fn publish(
        &self,
        config: &EncryptConfig,
        binding: &EncryptorBinding,
    ) -> Result<WiringParameters, ConfigError> {
        if config.secret_directory_path().is_empty() {
            return Err(ConfigError::missing_required(
                "secret_directory_path",
                "The secret directory path cannot be empty",
            ));
        }

        let mut parameters = WiringParameters::new();
        parameters.set(
            PARAM_ENCRYPTOR_CLASS_NAME,
            ParameterValue::String(binding.implementation.clone()),
        );
        parameters.set(
            PARAM_SECRET_DIRECTORY_PATH,
            ParameterValue::String(config.secret_directory_path().to_string()),
        );
        parameters.set(
            PARAM_ENABLE_SECRET_GENERATION,
            ParameterValue::Bool(config.enable_secret_generation()),
        );
        if let Some(secret) = config.secret() {
            parameters.set(PARAM_SECRET, ParameterValue::String(secret.to_string()));
        }

        tracing::debug!(parameters = ?parameters, "Published wiring parameters");
        Ok(parameters)
    }
}
