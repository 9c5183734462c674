use crate::config::{ConfigError, ConfigSource, ConfigValidator, NonEmptyValidator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::Path;

/// Root key of the bundle's section in a host configuration document
pub const CONFIG_ROOT: &str = "elif_encrypt";

/// Encryptor used when none is configured
pub const DEFAULT_ENCRYPTOR: &str = "Halite";

const KNOWN_KEYS: [&str; 5] = [
    "encryptor_class",
    "secret_directory_path",
    "enable_secret_generation",
    "secret",
    "wrap_exceptions",
];

/// Unvalidated configuration as supplied by the host.
///
/// Every field is optional so that several fragments can be layered on top of
/// each other before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryptor_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_directory_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_secret_generation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_exceptions: Option<bool>,
}

impl RawConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encryptor_class(mut self, encryptor_class: impl Into<String>) -> Self {
        self.encryptor_class = Some(encryptor_class.into());
        self
    }

    pub fn with_secret_directory_path(mut self, path: impl Into<String>) -> Self {
        self.secret_directory_path = Some(path.into());
        self
    }

    pub fn with_secret_generation(mut self, enabled: bool) -> Self {
        self.enable_secret_generation = Some(enabled);
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_wrap_exceptions(mut self, wrap: bool) -> Self {
        self.wrap_exceptions = Some(wrap);
        self
    }

    /// Parse the `elif_encrypt` section of a YAML document.
    ///
    /// Other root keys belong to the host and are ignored. A document without
    /// the section yields an empty layer.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let document: serde_yaml::Value = serde_yaml::from_str(source)?;
        let section = match document.get(CONFIG_ROOT) {
            None | Some(serde_yaml::Value::Null) => return Ok(Self::default()),
            Some(section) => section.clone(),
        };

        if let serde_yaml::Value::Mapping(mapping) = &section {
            for key in mapping.keys() {
                let key = key.as_str().unwrap_or_default();
                if !KNOWN_KEYS.contains(&key) {
                    return Err(ConfigError::UnknownKey {
                        root: CONFIG_ROOT.to_string(),
                        key: key.to_string(),
                    });
                }
            }
        }

        Ok(serde_yaml::from_value(section)?)
    }

    /// Read and parse a YAML configuration file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Load a configuration layer from `ELIF_ENCRYPT_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            encryptor_class: env_string("ELIF_ENCRYPT_ENCRYPTOR_CLASS")?,
            secret_directory_path: env_string("ELIF_ENCRYPT_SECRET_DIRECTORY_PATH")?,
            enable_secret_generation: env_bool("ELIF_ENCRYPT_ENABLE_SECRET_GENERATION")?,
            secret: env_string("ELIF_ENCRYPT_SECRET")?,
            wrap_exceptions: env_bool("ELIF_ENCRYPT_WRAP_EXCEPTIONS")?,
        })
    }

    /// Overlay `other` on top of `self`; values set in `other` win
    pub fn merge(self, other: RawConfig) -> RawConfig {
        RawConfig {
            encryptor_class: other.encryptor_class.or(self.encryptor_class),
            secret_directory_path: other.secret_directory_path.or(self.secret_directory_path),
            enable_secret_generation: other
                .enable_secret_generation
                .or(self.enable_secret_generation),
            secret: other.secret.or(self.secret),
            wrap_exceptions: other.wrap_exceptions.or(self.wrap_exceptions),
        }
    }

    /// Merge layers in order, later layers winning per key
    pub fn merge_all<I>(layers: I) -> RawConfig
    where
        I: IntoIterator<Item = RawConfig>,
    {
        layers
            .into_iter()
            .fold(RawConfig::default(), |merged, layer| merged.merge(layer))
    }
}

fn env_string(var: &str) -> Result<Option<String>, ConfigError> {
    match env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::environment_error(format!(
            "{} is not valid unicode",
            var
        ))),
    }
}

fn env_bool(var: &str) -> Result<Option<bool>, ConfigError> {
    let Some(value) = env_string(var)? else {
        return Ok(None);
    };

    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::invalid_value(
            var,
            value,
            "a boolean (true/false, 1/0, yes/no, on/off)",
        )),
    }
}

/// Report which layer supplied each effective value
pub fn config_sources(layers: &[RawConfig]) -> BTreeMap<&'static str, ConfigSource> {
    fn last_set<F>(layers: &[RawConfig], is_set: F) -> Option<usize>
    where
        F: Fn(&RawConfig) -> bool,
    {
        layers.iter().rposition(is_set)
    }

    let pick = |index: Option<usize>, fallback: ConfigSource| {
        index.map(ConfigSource::Layer).unwrap_or(fallback)
    };

    let mut sources = BTreeMap::new();
    sources.insert(
        "encryptor_class",
        pick(
            last_set(layers, |l| l.encryptor_class.is_some()),
            ConfigSource::Default(DEFAULT_ENCRYPTOR.to_string()),
        ),
    );
    sources.insert(
        "secret_directory_path",
        pick(
            last_set(layers, |l| l.secret_directory_path.is_some()),
            ConfigSource::Unset,
        ),
    );
    sources.insert(
        "enable_secret_generation",
        pick(
            last_set(layers, |l| l.enable_secret_generation.is_some()),
            ConfigSource::Default("true".to_string()),
        ),
    );
    sources.insert(
        "secret",
        pick(last_set(layers, |l| l.secret.is_some()), ConfigSource::Unset),
    );
    sources.insert(
        "wrap_exceptions",
        pick(
            last_set(layers, |l| l.wrap_exceptions.is_some()),
            ConfigSource::Default("false".to_string()),
        ),
    );
    sources
}

/// Validated, immutable bundle configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptConfig {
    encryptor_class: String,
    secret_directory_path: String,
    enable_secret_generation: bool,
    secret: Option<String>,
    wrap_exceptions: bool,
}

impl EncryptConfig {
    /// Apply defaults to `raw` and validate the result
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let config = Self {
            encryptor_class: raw
                .encryptor_class
                .unwrap_or_else(|| DEFAULT_ENCRYPTOR.to_string()),
            secret_directory_path: raw.secret_directory_path.unwrap_or_default(),
            enable_secret_generation: raw.enable_secret_generation.unwrap_or(true),
            secret: raw.secret,
            wrap_exceptions: raw.wrap_exceptions.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    /// Merge layers and validate the result
    pub fn from_layers<I>(layers: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = RawConfig>,
    {
        Self::from_raw(RawConfig::merge_all(layers))
    }

    /// Only emptiness is checked here. Whether an encryptor identifier can be
    /// instantiated is decided by the host during activation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        NonEmptyValidator::new(
            "encryptor_class",
            "Use an alias such as Halite or Defuse, or an implementation identifier",
        )
        .validate(self.encryptor_class.as_str())?;

        NonEmptyValidator::new(
            "secret_directory_path",
            "Set elif_encrypt.secret_directory_path to the directory holding key material",
        )
        .validate(self.secret_directory_path.as_str())?;

        Ok(())
    }

    pub fn encryptor_class(&self) -> &str {
        &self.encryptor_class
    }

    pub fn secret_directory_path(&self) -> &str {
        &self.secret_directory_path
    }

    pub fn enable_secret_generation(&self) -> bool {
        self.enable_secret_generation
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn has_inline_secret(&self) -> bool {
        self.secret.is_some()
    }

    pub fn wrap_exceptions(&self) -> bool {
        self.wrap_exceptions
    }
}

impl fmt::Debug for EncryptConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptConfig")
            .field("encryptor_class", &self.encryptor_class)
            .field("secret_directory_path", &self.secret_directory_path)
            .field("enable_secret_generation", &self.enable_secret_generation)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("wrap_exceptions", &self.wrap_exceptions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: [&str; 5] = [
        "ELIF_ENCRYPT_ENCRYPTOR_CLASS",
        "ELIF_ENCRYPT_SECRET_DIRECTORY_PATH",
        "ELIF_ENCRYPT_ENABLE_SECRET_GENERATION",
        "ELIF_ENCRYPT_SECRET",
        "ELIF_ENCRYPT_WRAP_EXCEPTIONS",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_are_applied() {
        let config =
            EncryptConfig::from_raw(RawConfig::new().with_secret_directory_path("/var/secrets"))
                .unwrap();

        assert_eq!(config.encryptor_class(), "Halite");
        assert!(config.enable_secret_generation());
        assert!(!config.wrap_exceptions());
        assert!(config.secret().is_none());
        assert!(!config.has_inline_secret());
    }

    #[test]
    fn test_missing_secret_directory_is_rejected() {
        let err = EncryptConfig::from_raw(RawConfig::new()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingRequired { ref field, .. } if field == "secret_directory_path"
        ));

        let err = EncryptConfig::from_raw(RawConfig::new().with_secret_directory_path(""))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn test_empty_secret_counts_as_present() {
        let config = EncryptConfig::from_raw(
            RawConfig::new()
                .with_secret_directory_path("/var/secrets")
                .with_secret(""),
        )
        .unwrap();

        assert_eq!(config.secret(), Some(""));
        assert!(config.has_inline_secret());
    }

    #[test]
    fn test_encryptor_names_are_not_restricted() {
        for name in ["custom-encryptor", "my-vault", "App\\Encryptor\\Custom", "my_app::Custom"] {
            let config = EncryptConfig::from_raw(
                RawConfig::new()
                    .with_secret_directory_path("/var/secrets")
                    .with_encryptor_class(name),
            )
            .unwrap();
            assert_eq!(config.encryptor_class(), name);
        }

        let err = EncryptConfig::from_raw(
            RawConfig::new()
                .with_secret_directory_path("/var/secrets")
                .with_encryptor_class(""),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingRequired { ref field, .. } if field == "encryptor_class"
        ));
    }

    #[test]
    fn test_whitespace_directory_is_kept_verbatim() {
        let config =
            EncryptConfig::from_raw(RawConfig::new().with_secret_directory_path(" ")).unwrap();
        assert_eq!(config.secret_directory_path(), " ");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = EncryptConfig::from_raw(
            RawConfig::new()
                .with_secret_directory_path("/var/secrets")
                .with_secret("abc123"),
        )
        .unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("abc123"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_later_layers_win() {
        let base = RawConfig::new()
            .with_encryptor_class("Defuse")
            .with_secret_directory_path("/etc/app/keys")
            .with_wrap_exceptions(false);
        let local = RawConfig::new()
            .with_secret_directory_path("/var/secrets")
            .with_wrap_exceptions(true);

        let config = EncryptConfig::from_layers(vec![base.clone(), local.clone()]).unwrap();
        assert_eq!(config.encryptor_class(), "Defuse");
        assert_eq!(config.secret_directory_path(), "/var/secrets");
        assert!(config.wrap_exceptions());

        let sources = config_sources(&[base, local]);
        assert_eq!(sources["encryptor_class"], ConfigSource::Layer(0));
        assert_eq!(sources["secret_directory_path"], ConfigSource::Layer(1));
        assert_eq!(sources["secret"], ConfigSource::Unset);
        assert_eq!(
            sources["enable_secret_generation"],
            ConfigSource::Default("true".to_string())
        );
    }

    #[test]
    fn test_yaml_section_is_parsed() {
        let raw = RawConfig::from_yaml_str(
            r#"
framework:
  secret: ignored
elif_encrypt:
  encryptor_class: Defuse
  secret_directory_path: /var/secrets
  enable_secret_generation: false
  wrap_exceptions: true
"#,
        )
        .unwrap();

        assert_eq!(raw.encryptor_class.as_deref(), Some("Defuse"));
        assert_eq!(raw.secret_directory_path.as_deref(), Some("/var/secrets"));
        assert_eq!(raw.enable_secret_generation, Some(false));
        assert_eq!(raw.wrap_exceptions, Some(true));
        assert!(raw.secret.is_none());
    }

    #[test]
    fn test_yaml_without_section_is_empty_layer() {
        let raw = RawConfig::from_yaml_str("framework: {}\n").unwrap();
        assert_eq!(raw, RawConfig::default());
    }

    #[test]
    fn test_yaml_unknown_key_is_rejected() {
        let err = RawConfig::from_yaml_str("elif_encrypt:\n  secret_dir: /tmp\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { ref key, .. } if key == "secret_dir"));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("ELIF_ENCRYPT_SECRET_DIRECTORY_PATH", "/run/keys");
        env::set_var("ELIF_ENCRYPT_WRAP_EXCEPTIONS", "yes");
        env::set_var("ELIF_ENCRYPT_ENABLE_SECRET_GENERATION", "0");

        let raw = RawConfig::from_env().unwrap();
        clear_env();

        assert_eq!(raw.secret_directory_path.as_deref(), Some("/run/keys"));
        assert_eq!(raw.wrap_exceptions, Some(true));
        assert_eq!(raw.enable_secret_generation, Some(false));
        assert!(raw.encryptor_class.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_bool() {
        clear_env();
        env::set_var("ELIF_ENCRYPT_WRAP_EXCEPTIONS", "sometimes");

        let result = RawConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
