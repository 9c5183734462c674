use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Unknown configuration key '{key}' under '{root}'")]
    UnknownKey { root: String, key: String },

    #[error("Bootstrap already ran (state: {state}); load must be invoked exactly once")]
    AlreadyLoaded { state: String },

    #[error("Environment variable error: {message}")]
    EnvironmentError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create an already loaded error
    pub fn already_loaded(state: impl Into<String>) -> Self {
        Self::AlreadyLoaded {
            state: state.into(),
        }
    }

    /// Create an environment error
    pub fn environment_error(message: impl Into<String>) -> Self {
        Self::EnvironmentError {
            message: message.into(),
        }
    }

    /// Check if the error reports a repeated bootstrap
    pub fn is_already_loaded(&self) -> bool {
        matches!(self, Self::AlreadyLoaded { .. })
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Rejects empty strings
pub struct NonEmptyValidator {
    pub field: &'static str,
    pub hint: &'static str,
}

impl NonEmptyValidator {
    pub fn new(field: &'static str, hint: &'static str) -> Self {
        Self { field, hint }
    }
}

impl ConfigValidator<str> for NonEmptyValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::missing_required(self.field, self.hint));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_validator() {
        let validator = NonEmptyValidator::new("secret_directory_path", "required");

        assert!(validator.validate("/var/secrets").is_ok());
        assert!(matches!(
            validator.validate(""),
            Err(ConfigError::MissingRequired { .. })
        ));
        assert!(validator.validate(" ").is_ok());
    }
}
