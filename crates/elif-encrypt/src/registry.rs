use serde::Serialize;
use std::collections::BTreeMap;

/// Identifier bound for the `Defuse` alias
pub const DEFUSE_ENCRYPTOR: &str = "elif_encrypt::encryptors::DefuseEncryptor";

/// Identifier bound for the `Halite` alias
pub const HALITE_ENCRYPTOR: &str = "elif_encrypt::encryptors::HaliteEncryptor";

/// Result of resolving a configured encryptor name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptorBinding {
    /// Name exactly as configured
    pub requested: String,
    /// Implementation identifier bound at runtime
    pub implementation: String,
    /// Whether `requested` was a known alias
    pub aliased: bool,
}

/// Maps short encryptor aliases to fully-qualified implementation identifiers.
///
/// Names that are not in the table pass through unchanged, so hosts can plug
/// in their own encryptors by identifier without touching the table. Whether
/// such an identifier is loadable is only checked when the host instantiates
/// it during activation.
#[derive(Debug, Clone)]
pub struct EncryptorRegistry {
    aliases: BTreeMap<String, String>,
}

impl EncryptorRegistry {
    /// Registry with the built-in aliases
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_alias("Defuse", DEFUSE_ENCRYPTOR);
        registry.register_alias("Halite", HALITE_ENCRYPTOR);
        registry
    }

    /// Registry without any alias
    pub fn empty() -> Self {
        Self {
            aliases: BTreeMap::new(),
        }
    }

    /// Add or replace a short alias
    pub fn register_alias(&mut self, alias: impl Into<String>, implementation: impl Into<String>) {
        self.aliases.insert(alias.into(), implementation.into());
    }

    pub fn with_alias(mut self, alias: impl Into<String>, implementation: impl Into<String>) -> Self {
        self.register_alias(alias, implementation);
        self
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Alias table in alphabetical order
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .iter()
            .map(|(alias, implementation)| (alias.as_str(), implementation.as_str()))
    }

    /// Resolve a configured name to the implementation identifier
    pub fn resolve(&self, name: &str) -> EncryptorBinding {
        match self.aliases.get(name) {
            Some(implementation) => EncryptorBinding {
                requested: name.to_string(),
                implementation: implementation.clone(),
                aliased: true,
            },
            None => {
                if !self.aliases.values().any(|known| known == name) {
                    tracing::warn!(
                        encryptor = name,
                        "Unknown encryptor '{}', binding it as a fully-qualified identifier",
                        name
                    );
                }
                EncryptorBinding {
                    requested: name.to_string(),
                    implementation: name.to_string(),
                    aliased: false,
                }
            }
        }
    }
}

impl Default for EncryptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_aliases() {
        let registry = EncryptorRegistry::new();

        let binding = registry.resolve("Defuse");
        assert_eq!(binding.implementation, DEFUSE_ENCRYPTOR);
        assert!(binding.aliased);

        assert_eq!(registry.resolve("Halite").implementation, HALITE_ENCRYPTOR);
        assert_eq!(
            registry.aliases().collect::<Vec<_>>(),
            vec![("Defuse", DEFUSE_ENCRYPTOR), ("Halite", HALITE_ENCRYPTOR)]
        );
    }

    #[test]
    fn test_unknown_name_passes_through() {
        let registry = EncryptorRegistry::new();
        let binding = registry.resolve("my_app::crypto::VaultEncryptor");

        assert_eq!(binding.implementation, "my_app::crypto::VaultEncryptor");
        assert_eq!(binding.requested, "my_app::crypto::VaultEncryptor");
        assert!(!binding.aliased);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let registry = EncryptorRegistry::new();

        let once = registry.resolve("Defuse");
        let twice = registry.resolve(&once.implementation);
        assert_eq!(twice.implementation, once.implementation);
        assert_eq!(registry.resolve("Defuse"), once);
    }

    #[test]
    fn test_aliases_are_case_sensitive() {
        let registry = EncryptorRegistry::new();
        assert!(!registry.is_alias("defuse"));
        assert_eq!(registry.resolve("defuse").implementation, "defuse");
    }

    #[test]
    fn test_custom_alias() {
        let registry = EncryptorRegistry::new().with_alias("Vault", "my_app::crypto::VaultEncryptor");
        assert!(registry.is_alias("Vault"));
        assert_eq!(
            registry.resolve("Vault").implementation,
            "my_app::crypto::VaultEncryptor"
        );
    }
}
